//! One refresh cycle for one configuration domain.
//!
//! # Data Flow
//! ```text
//! fetcher.fetch(sources, scope)
//!     → fingerprint (SHA-256 over contents ordered by source id)
//!     → unchanged and skips left? count a skip and stop
//!     → parse each source; failed sources contribute nothing
//!     → merge in registration order (later source wins a name)
//!     → store.publish(merged)   (total replace)
//! ```
//!
//! # Design Decisions
//! - A cycle either publishes a complete catalog or leaves the store untouched
//! - Entries from a source that failed this cycle are not carried forward
//! - Fetch failures propagate; per-source and per-entry failures only count

pub mod metrics;

pub use metrics::{RefreshMetrics, RefreshStats};

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::catalog::CatalogMerger;
use crate::fetch::{FetchError, Fetcher, SourceContents};
use crate::parser::Parser;
use crate::store::Store;

/// Errors that abort a refresh cycle.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Fetching failed; nothing was published.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The fetcher returned content nobody asked for.
    #[error("Reader `{reader}` received unrequested source `{source_id}`")]
    UnexpectedSource { reader: String, source_id: String },
}

impl ReadError {
    /// Faults indicate a broken collaborator rather than bad content or a
    /// flaky transport; the scheduler stops the reader on them.
    pub fn is_fault(&self) -> bool {
        matches!(self, ReadError::UnexpectedSource { .. })
    }
}

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Content unchanged and skip budget left; nothing parsed.
    Skipped,
    /// A new catalog was published.
    Updated {
        entries: usize,
        content_failures: u64,
        duplicates: u64,
    },
}

/// SHA-256 over a cycle's fetched content.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hash of `contents` in source-id order.
    ///
    /// Each content is framed by its source id and length, so moving text
    /// between sources changes the fingerprint.
    pub fn of(contents: &SourceContents) -> Self {
        let mut ordered: Vec<_> = contents.iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(b.0));

        let mut digest = Sha256::new();
        for (id, content) in ordered {
            digest.update(id.as_bytes());
            digest.update(b"\0");
            digest.update((content.len() as u64).to_be_bytes());
            digest.update(content.as_bytes());
        }
        Self(digest.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(self.0))
    }
}

/// Scheduler-facing view of a reader, independent of its value type.
#[async_trait]
pub trait Refresh: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &str;

    /// Run one cycle.
    async fn execute(&self) -> Result<CycleOutcome, ReadError>;

    /// Force the next cycle to treat any content as new.
    fn reset(&self);
}

/// Fetches, parses and publishes one configuration domain.
pub struct Reader<T> {
    name: String,
    sources: Vec<String>,
    scope: String,
    fetcher: Arc<dyn Fetcher>,
    parser: Parser<T>,
    store: Arc<Store<T>>,
    metrics: Arc<RefreshMetrics>,
    skip_budget: u32,
    skips_remaining: AtomicU32,
    last_fingerprint: Mutex<Option<Fingerprint>>,
}

impl<T> Reader<T> {
    /// Create a reader. Its name is `<scope>/<parser root>`.
    pub fn new(
        sources: Vec<String>,
        scope: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        parser: Parser<T>,
        store: Arc<Store<T>>,
        skip_budget: u32,
    ) -> Self {
        let scope = scope.into();
        let name = format!("{}/{}", scope, parser.root());
        let metrics = Arc::new(RefreshMetrics::new(name.clone()));
        Self {
            name,
            sources,
            scope,
            fetcher,
            parser,
            store,
            metrics,
            skip_budget,
            skips_remaining: AtomicU32::new(skip_budget),
            last_fingerprint: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn store(&self) -> &Arc<Store<T>> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<RefreshMetrics> {
        &self.metrics
    }

    /// Run one fetch → fingerprint → parse → publish cycle.
    pub async fn execute(&self) -> Result<CycleOutcome, ReadError> {
        let contents = self.fetcher.fetch(&self.sources, &self.scope).await?;
        if let Some(source_id) = contents.keys().find(|id| !self.sources.contains(*id)) {
            return Err(ReadError::UnexpectedSource {
                reader: self.name.clone(),
                source_id: source_id.clone(),
            });
        }

        let fingerprint = Fingerprint::of(&contents);
        if self.unchanged(&fingerprint) && self.consume_skip() {
            self.metrics.record_same_content_skip();
            tracing::debug!(reader = %self.name, fingerprint = %fingerprint, "Content unchanged, skipping");
            return Ok(CycleOutcome::Skipped);
        }

        self.metrics.record_new_content_update();
        let outcome = self.publish(&contents);
        self.remember(fingerprint);
        self.skips_remaining.store(self.skip_budget, Ordering::Release);

        tracing::info!(reader = %self.name, fingerprint = %fingerprint, outcome = ?outcome, "Published catalog");
        Ok(outcome)
    }

    /// Force the next cycle to parse and publish even if content is unchanged.
    pub fn reset(&self) {
        self.skips_remaining.store(0, Ordering::Release);
    }

    fn publish(&self, contents: &SourceContents) -> CycleOutcome {
        let mut merger = CatalogMerger::new();
        let mut content_failures = 0;
        let mut skipped_entries = 0;

        for source_id in &self.sources {
            let Some(content) = contents.get(source_id) else {
                continue;
            };
            match self.parser.parse(content) {
                Ok(parsed) => {
                    skipped_entries += parsed.skipped;
                    merger.merge(parsed.catalog);
                }
                Err(e) => {
                    content_failures += 1;
                    tracing::warn!(
                        reader = %self.name,
                        source = %source_id,
                        error = %e,
                        "Dropping source contribution"
                    );
                }
            }
        }

        let duplicates = merger.duplicates();
        let catalog = merger.finish();
        let entries = catalog.len();
        self.store.publish(catalog);
        crate::observability::metrics::record_snapshot_size(&self.name, entries);

        self.metrics.record_content_failures(content_failures);
        self.metrics.record_name_duplicates(duplicates);
        self.metrics.record_skipped_entries(skipped_entries);
        self.metrics.record_entries_updated(entries as u64);

        CycleOutcome::Updated {
            entries,
            content_failures,
            duplicates,
        }
    }

    fn unchanged(&self, fingerprint: &Fingerprint) -> bool {
        let last = self.last_fingerprint.lock().unwrap_or_else(PoisonError::into_inner);
        last.as_ref() == Some(fingerprint)
    }

    fn remember(&self, fingerprint: Fingerprint) {
        let mut last = self.last_fingerprint.lock().unwrap_or_else(PoisonError::into_inner);
        *last = Some(fingerprint);
    }

    fn consume_skip(&self) -> bool {
        self.skips_remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Refresh for Reader<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<CycleOutcome, ReadError> {
        Reader::execute(self).await
    }

    fn reset(&self) {
        Reader::reset(self)
    }
}
