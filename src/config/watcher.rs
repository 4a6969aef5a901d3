//! Source directory watcher.
//!
//! Content changes on disk wake the loader instead of waiting out the
//! refresh interval. The readers still decide, by fingerprint, whether
//! anything needs publishing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches a directory tree and calls back on content changes.
pub struct SourceWatcher {
    path: PathBuf,
}

impl SourceWatcher {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Start watching in a background thread.
    ///
    /// The watch stops when the returned handle is dropped.
    pub fn run<F>(self, on_change: F) -> Result<RecommendedWatcher, notify::Error>
    where
        F: Fn() + Send + 'static,
    {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_content_change(&event) {
                        tracing::debug!(paths = ?event.paths, "Source change detected, triggering refresh");
                        on_change();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.path, "Source watcher started");
        Ok(watcher)
    }
}

fn is_content_change(event: &Event) -> bool {
    event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, EventKind};

    #[test]
    fn test_missing_directory_fails() {
        let watcher = SourceWatcher::new(Path::new("/definitely/not/here"));
        assert!(watcher.run(|| {}).is_err());
    }

    #[test]
    fn test_access_is_not_a_change() {
        assert!(is_content_change(&Event::new(EventKind::Create(CreateKind::File))));
        assert!(!is_content_change(&Event::new(EventKind::Access(AccessKind::Any))));
    }
}
