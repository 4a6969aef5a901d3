//! Local filesystem fetcher.
//!
//! Reads `<base>/<scope>/<source-id>` as UTF-8 text. Source ids are
//! usually written with a leading slash (`/featureflags.json`).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::fetch::{FetchError, FetchResult, Fetcher, SourceContents};
use crate::observability::metrics;

/// Fetcher over a local directory tree.
#[derive(Debug)]
pub struct FilesystemFetcher {
    base_path: PathBuf,
    skip_missing: bool,
    stats: FetchCounters,
}

#[derive(Debug, Default)]
struct FetchCounters {
    requests: AtomicU64,
    missing_sources: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of fetcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub requests: u64,
    pub missing_sources: u64,
    pub failures: u64,
}

impl FilesystemFetcher {
    /// Create a fetcher rooted at `base_path`.
    ///
    /// With `skip_missing`, absent files are left out of the result instead
    /// of failing the fetch.
    pub fn new(base_path: impl Into<PathBuf>, skip_missing: bool) -> Self {
        Self {
            base_path: base_path.into(),
            skip_missing,
            stats: FetchCounters::default(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            requests: self.stats.requests.load(Ordering::Relaxed),
            missing_sources: self.stats.missing_sources.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
        }
    }

    fn path_for(&self, source_id: &str, scope: &str) -> PathBuf {
        self.base_path
            .join(scope)
            .join(source_id.trim_start_matches('/'))
    }

    async fn fetch_all(&self, source_ids: &[String], scope: &str) -> FetchResult<SourceContents> {
        let mut contents = SourceContents::with_capacity(source_ids.len());
        for source_id in source_ids {
            let path = self.path_for(source_id, scope);
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    contents.insert(source_id.clone(), content);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    self.stats.missing_sources.fetch_add(1, Ordering::Relaxed);
                    metrics::record_missing_source(scope);
                    if !self.skip_missing {
                        return Err(FetchError::MissingSource {
                            source_id: source_id.clone(),
                            scope: scope.to_string(),
                        });
                    }
                    tracing::debug!(path = %path.display(), "Skipping missing source");
                }
                Err(e) => {
                    return Err(FetchError::Io {
                        source_id: source_id.clone(),
                        source: e,
                    });
                }
            }
        }
        Ok(contents)
    }
}

#[async_trait]
impl Fetcher for FilesystemFetcher {
    async fn fetch(&self, source_ids: &[String], scope: &str) -> FetchResult<SourceContents> {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        let result = self.fetch_all(source_ids, scope).await;
        if result.is_err() {
            self.stats.failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("myapp")).unwrap();
        fs::write(
            dir.path().join("myapp/featureflags.json"),
            r#"{ "feature-flags": { "enable-all": { "value": true } } }"#,
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_fetch_existing() {
        let dir = setup();
        let fetcher = FilesystemFetcher::new(dir.path(), false);

        let contents = fetcher.fetch(&ids(&["/featureflags.json"]), "myapp").await.unwrap();

        assert_eq!(contents.len(), 1);
        assert!(contents["/featureflags.json"].contains("enable-all"));
        assert_eq!(
            fetcher.stats(),
            FetchStats {
                requests: 1,
                missing_sources: 0,
                failures: 0
            }
        );
    }

    #[tokio::test]
    async fn test_missing_source_fails_without_skip() {
        let dir = setup();
        let fetcher = FilesystemFetcher::new(dir.path(), false);

        let err = fetcher
            .fetch(&ids(&["/featureflags.json", "/missing.json"]), "myapp")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::MissingSource { ref source_id, .. } if source_id == "/missing.json"));
        assert_eq!(fetcher.stats().missing_sources, 1);
        assert_eq!(fetcher.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_missing_source_skipped() {
        let dir = setup();
        let fetcher = FilesystemFetcher::new(dir.path(), true);

        let contents = fetcher
            .fetch(&ids(&["/featureflags.json", "/missing.json"]), "myapp")
            .await
            .unwrap();

        assert_eq!(contents.len(), 1);
        assert!(!contents.contains_key("/missing.json"));
        assert_eq!(fetcher.stats().missing_sources, 1);
        assert_eq!(fetcher.stats().failures, 0);
    }

    #[test]
    fn test_path_layout() {
        let fetcher = FilesystemFetcher::new("/etc/flags", true);
        assert_eq!(
            fetcher.path_for("/featureflags.json", "myapp"),
            PathBuf::from("/etc/flags/myapp/featureflags.json")
        );
    }
}
