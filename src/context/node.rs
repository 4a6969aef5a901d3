//! Value-with-overrides tree.

use std::collections::BTreeMap;

use serde::Serialize;

use super::ConfigurationContext;

/// One level of an override hierarchy.
///
/// `value` is the default for this subtree and is always present, so
/// resolution can never come back empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextNode<T> {
    /// Default value at this level.
    pub value: T,

    /// Optional overrides keyed by a single dimension.
    #[serde(rename = "modifiers", skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Overrides<T>>,
}

/// Branches selected by the value of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overrides<T> {
    /// Dimension that governs every branch at this level.
    #[serde(rename = "type")]
    pub dimension: String,

    /// Dimension value → subtree.
    #[serde(rename = "contexts")]
    pub branches: BTreeMap<String, ContextNode<T>>,
}

impl<T> ContextNode<T> {
    /// A node without overrides.
    pub fn leaf(value: T) -> Self {
        Self {
            value,
            overrides: None,
        }
    }

    /// A node whose default can be overridden along `dimension`.
    pub fn with_overrides<D, I, K>(value: T, dimension: D, branches: I) -> Self
    where
        D: Into<String>,
        I: IntoIterator<Item = (K, ContextNode<T>)>,
        K: Into<String>,
    {
        Self {
            value,
            overrides: Some(Overrides {
                dimension: dimension.into(),
                branches: branches.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            }),
        }
    }

    /// Resolve the value for `context`.
    ///
    /// Descends while the governing dimension of the current level is
    /// present in `context` and names an existing branch; the value of the
    /// last node reached is returned. Unknown dimension values and
    /// irrelevant extra dimensions simply stop or never start the descent.
    pub fn resolve(&self, context: &ConfigurationContext) -> &T {
        let mut node = self;
        while let Some(next) = node.select(context) {
            node = next;
        }
        &node.value
    }

    fn select(&self, context: &ConfigurationContext) -> Option<&ContextNode<T>> {
        let overrides = self.overrides.as_ref()?;
        let dimension_value = context.get(&overrides.dimension)?;
        overrides.branches.get(dimension_value)
    }

    /// Depth of the tree, counting this node as 1.
    pub fn depth(&self) -> usize {
        1 + self
            .overrides
            .as_ref()
            .and_then(|o| o.branches.values().map(ContextNode::depth).max())
            .unwrap_or(0)
    }
}
