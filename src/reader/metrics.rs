//! Per-reader refresh counters.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::observability::metrics;

/// Monotonic counters for one reader, mirrored to the metrics facade.
#[derive(Debug)]
pub struct RefreshMetrics {
    reader: String,
    same_content_skips: AtomicU64,
    new_content_updates: AtomicU64,
    entries_updated: AtomicU64,
    content_failures: AtomicU64,
    name_duplicates: AtomicU64,
    skipped_entries: AtomicU64,
}

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub same_content_skips: u64,
    pub new_content_updates: u64,
    pub entries_updated: u64,
    pub content_failures: u64,
    pub name_duplicates: u64,
    pub skipped_entries: u64,
}

impl RefreshMetrics {
    pub fn new(reader: impl Into<String>) -> Self {
        Self {
            reader: reader.into(),
            same_content_skips: AtomicU64::new(0),
            new_content_updates: AtomicU64::new(0),
            entries_updated: AtomicU64::new(0),
            content_failures: AtomicU64::new(0),
            name_duplicates: AtomicU64::new(0),
            skipped_entries: AtomicU64::new(0),
        }
    }

    pub fn reader(&self) -> &str {
        &self.reader
    }

    pub fn record_same_content_skip(&self) {
        self.add(&self.same_content_skips, "same_content_skips", 1);
    }

    pub fn record_new_content_update(&self) {
        self.add(&self.new_content_updates, "new_content_updates", 1);
    }

    pub fn record_entries_updated(&self, count: u64) {
        self.add(&self.entries_updated, "entries_updated", count);
    }

    pub fn record_content_failures(&self, count: u64) {
        self.add(&self.content_failures, "content_failures", count);
    }

    pub fn record_name_duplicates(&self, count: u64) {
        self.add(&self.name_duplicates, "name_duplicates", count);
    }

    pub fn record_skipped_entries(&self, count: u64) {
        self.add(&self.skipped_entries, "skipped_entries", count);
    }

    pub fn snapshot(&self) -> RefreshStats {
        RefreshStats {
            same_content_skips: self.same_content_skips.load(Ordering::Relaxed),
            new_content_updates: self.new_content_updates.load(Ordering::Relaxed),
            entries_updated: self.entries_updated.load(Ordering::Relaxed),
            content_failures: self.content_failures.load(Ordering::Relaxed),
            name_duplicates: self.name_duplicates.load(Ordering::Relaxed),
            skipped_entries: self.skipped_entries.load(Ordering::Relaxed),
        }
    }

    fn add(&self, counter: &AtomicU64, kind: &'static str, count: u64) {
        if count == 0 {
            return;
        }
        counter.fetch_add(count, Ordering::Relaxed);
        metrics::record_refresh(&self.reader, kind, count);
    }
}
