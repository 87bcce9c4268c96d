//! Kalamar core: federated, schema-typed item storage.
//!
//! A [`Site`] routes path queries to named [`AccessPoint`]s, each pairing a
//! property schema with a storage backend and an optional content codec.

pub mod access_point;
pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod site;
pub mod store;

pub use access_point::{AccessPoint, AccessPointError, AccessPointResult};
pub use codec::{codec_for_name, CodecError, ContentCodec, HeaderCodec, JsonCodec};
pub use config::{AccessPointConfig, ConfigError, ConfigResult, SiteConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{Item, ItemError, PropertyMap};
pub use model::schema::{PropertyDef, PropertySchema, SchemaError, ValueType, CONTENT_PROPERTY};
pub use model::value::PropertyValue;
pub use query::{escape_value, explicit_query, parse_query, Constraint, QueryError};
pub use site::{CorruptContentPolicy, SearchResults, Site, SiteError, SiteResult};
pub use store::{MemoryStore, RawRecord, RecordKey, SqliteStore, StorageBackend, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
