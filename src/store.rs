//! Published catalog holder.
//!
//! # Design Decisions
//! - `ArcSwap` gives lock-free reads and constant-time whole-catalog replacement
//! - Readers keep the `Arc` they loaded; a publish never mutates it
//! - No partial updates: every publish is a full catalog

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::catalog::{Catalog, ConfigurationEntry};

/// Holds the live catalog for one configuration domain.
#[derive(Debug)]
pub struct Store<T> {
    current: ArcSwap<Catalog<T>>,
}

impl<T> Store<T> {
    /// Create a store holding an empty catalog.
    pub fn new() -> Self {
        Self::with_catalog(Catalog::empty())
    }

    pub fn with_catalog(catalog: Catalog<T>) -> Self {
        Self {
            current: ArcSwap::from_pointee(catalog),
        }
    }

    /// Snapshot of the current catalog. Never blocks.
    pub fn read(&self) -> Arc<Catalog<T>> {
        self.current.load_full()
    }

    /// Replace the catalog. Later `read` calls see `catalog` in full.
    pub fn publish(&self, catalog: Catalog<T>) {
        self.current.store(Arc::new(catalog));
    }

    /// Entry named `name` in the current snapshot.
    pub fn lookup(&self, name: &str) -> Option<Arc<ConfigurationEntry<T>>> {
        self.current.load().get(name).cloned()
    }
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConfigurationContext, ContextNode};
    use std::thread;

    fn catalog_of(names: &[&str], value: u32) -> Catalog<u32> {
        names
            .iter()
            .map(|name| ConfigurationEntry::new(*name, ContextNode::leaf(value)))
            .collect()
    }

    #[test]
    fn test_starts_empty() {
        let store: Store<bool> = Store::new();
        assert!(store.read().is_empty());
        assert!(store.lookup("anything").is_none());
    }

    #[test]
    fn test_publish_replaces_whole_catalog() {
        let store = Store::new();
        store.publish(catalog_of(&["a", "b"], 1));
        let old = store.read();

        store.publish(catalog_of(&["c"], 2));

        // old snapshot untouched
        assert_eq!(old.len(), 2);
        let new = store.read();
        assert_eq!(new.len(), 1);
        assert!(store.lookup("a").is_none());
        let entry = store.lookup("c").unwrap();
        assert_eq!(*entry.resolve(&ConfigurationContext::new()), 2);
    }

    #[test]
    fn test_concurrent_readers_see_complete_snapshots() {
        let store = Arc::new(Store::new());
        store.publish(catalog_of(&["a", "b", "c"], 0));

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for round in 1..200u32 {
                    store.publish(catalog_of(&["a", "b", "c"], round));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    let ctx = ConfigurationContext::new();
                    for _ in 0..500 {
                        let snapshot = store.read();
                        let values: Vec<u32> = snapshot.entries().map(|e| *e.resolve(&ctx)).collect();
                        assert_eq!(values.len(), 3);
                        assert!(values.iter().all(|v| *v == values[0]), "mixed snapshot: {:?}", values);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
