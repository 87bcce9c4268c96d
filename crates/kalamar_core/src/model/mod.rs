//! Domain model shared by every access point.
//!
//! # Responsibility
//! - Define the typed property schema, property values and item snapshots.
//! - Validate item shape against its schema before anything reaches storage.
//!
//! # Invariants
//! - Schemas are immutable once an access point is built.
//! - Items never carry keys their schema does not declare.

pub mod item;
pub mod schema;
pub mod value;
