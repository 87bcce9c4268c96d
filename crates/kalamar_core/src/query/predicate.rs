//! Constraint evaluation over property maps.

use super::Constraint;
use crate::model::item::{Item, PropertyMap};

/// Returns whether every constraint holds on `properties`.
///
/// A missing property is a non-match, never an error.
pub fn matches(properties: &PropertyMap, constraints: &[Constraint]) -> bool {
    constraints.iter().all(|constraint| {
        properties
            .get(&constraint.property)
            .is_some_and(|value| *value == constraint.expected)
    })
}

/// Owned conjunction of constraints, as carried by a running search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    constraints: Vec<Constraint>,
}

impl Predicate {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn matches(&self, item: &Item) -> bool {
        matches(item.properties(), &self.constraints)
    }
}
