//! Source transport seam.
//!
//! # Responsibilities
//! - Turn a list of source ids plus a scope into raw text per source
//! - Distinguish a missing source (tolerable) from a transport failure (fatal for the cycle)
//!
//! # Design Decisions
//! - Async trait object so readers of different value types share one fetcher
//! - Implementations decide whether a missing source is skipped or raised

pub mod filesystem;

pub use filesystem::FilesystemFetcher;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Raw text keyed by source id.
pub type SourceContents = HashMap<String, String>;

/// Errors returned by a fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A single source does not exist.
    #[error("Missing source `{source_id}` in scope `{scope}`")]
    MissingSource { source_id: String, scope: String },

    /// The transport failed as a whole.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An I/O error while reading a source.
    #[error("I/O error reading `{source_id}`: {source}")]
    Io {
        source_id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Fetches source content for a reader.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch every source in `source_ids` under `scope`.
    async fn fetch(&self, source_ids: &[String], scope: &str) -> FetchResult<SourceContents>;
}
