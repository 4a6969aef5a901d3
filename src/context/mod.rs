//! Request-time context and the override tree it selects from.
//!
//! # Data Flow
//! ```text
//! caller builds ConfigurationContext { environment: qa, user: joe }
//!     → ContextNode::resolve walks the override tree
//!     → deepest node whose dimension matched supplies the value
//! ```
//!
//! # Design Decisions
//! - Contexts are plain ordered maps, built per request and never retained
//! - One dimension per override level; deeper levels may switch dimension
//! - Matching is exact, case-sensitive string equality

pub mod node;

pub use node::{ContextNode, Overrides};

use std::collections::BTreeMap;

/// Dimension values supplied by the caller for a single resolution.
///
/// Equality and hashing are structural over the dimension map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConfigurationContext {
    dimensions: BTreeMap<String, String>,
}

impl ConfigurationContext {
    /// Create an empty context. Resolving against it always yields root values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(dimension, value);
        self
    }

    /// Set the value for a dimension, replacing any previous one.
    pub fn insert(&mut self, dimension: impl Into<String>, value: impl Into<String>) {
        self.dimensions.insert(dimension.into(), value.into());
    }

    /// Value for a dimension, if the caller supplied one.
    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.dimensions.get(dimension).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dimensions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigurationContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (dimension, value) in iter {
            context.insert(dimension, value);
        }
        context
    }
}
