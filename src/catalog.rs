//! Immutable name → override tree snapshots.
//!
//! # Design Decisions
//! - A catalog is built once (one parse pass or one merged refresh) and never mutated
//! - Entries are `Arc`-shared so lookups can outlive the snapshot they came from
//! - Names are kept sorted for stable listings and serialization

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::{ConfigurationContext, ContextNode};

/// A named override tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationEntry<T> {
    name: String,
    root: ContextNode<T>,
}

impl<T> ConfigurationEntry<T> {
    pub fn new(name: impl Into<String>, root: ContextNode<T>) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &ContextNode<T> {
        &self.root
    }

    /// Resolve this entry for `context`. Never empty.
    pub fn resolve(&self, context: &ConfigurationContext) -> &T {
        self.root.resolve(context)
    }
}

/// A complete, self-consistent set of entries.
#[derive(Debug, PartialEq)]
pub struct Catalog<T> {
    entries: BTreeMap<String, Arc<ConfigurationEntry<T>>>,
}

impl<T> Catalog<T> {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ConfigurationEntry<T>>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolve `name` for `context`, `None` if the catalog has no such entry.
    pub fn resolve(&self, name: &str, context: &ConfigurationContext) -> Option<&T> {
        self.entries.get(name).map(|entry| entry.resolve(context))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<ConfigurationEntry<T>>> {
        self.entries.values()
    }

    fn into_entries(self) -> impl Iterator<Item = (String, Arc<ConfigurationEntry<T>>)> {
        self.entries.into_iter()
    }
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Clone for Catalog<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

/// Later entries with the same name replace earlier ones.
impl<T> FromIterator<ConfigurationEntry<T>> for Catalog<T> {
    fn from_iter<I: IntoIterator<Item = ConfigurationEntry<T>>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.name.clone(), Arc::new(entry)))
                .collect(),
        }
    }
}

/// Accumulates several catalogs into one, counting name collisions.
#[derive(Debug)]
pub struct CatalogMerger<T> {
    entries: BTreeMap<String, Arc<ConfigurationEntry<T>>>,
    duplicates: u64,
}

impl<T> CatalogMerger<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            duplicates: 0,
        }
    }

    /// Merge `catalog` on top of what has been accumulated so far.
    ///
    /// Returns the number of names it overwrote.
    pub fn merge(&mut self, catalog: Catalog<T>) -> u64 {
        let mut overwritten = 0;
        for (name, entry) in catalog.into_entries() {
            if self.entries.insert(name, entry).is_some() {
                overwritten += 1;
            }
        }
        self.duplicates += overwritten;
        overwritten
    }

    /// Total overwrites across every merge.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn finish(self) -> Catalog<T> {
        Catalog {
            entries: self.entries,
        }
    }
}

impl<T> Default for CatalogMerger<T> {
    fn default() -> Self {
        Self::new()
    }
}
