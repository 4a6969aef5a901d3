//! Shared fetchers and content for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use flagtree::fetch::{FetchError, FetchResult, Fetcher, SourceContents};
use flagtree::parser::{MissingTypePolicy, Parser, Uniform};
use flagtree::reader::{CycleOutcome, ReadError, Refresh};
use flagtree::{ConfigurationContext, Reader, Store};

pub const FLAGS_A: &str = r#"{
    "feature-flags": {
        "enable-one": {
            "value": false,
            "modifiers": {
                "type": "environment",
                "contexts": { "qa": { "value": true } }
            }
        },
        "flag-a": { "value": false }
    }
}"#;

pub const FLAGS_B: &str = r#"{
    "feature-flags": {
        "flag-a": { "value": true },
        "flag-b": { "value": true }
    }
}"#;

pub const MALFORMED: &str = r#"{ "feature-flags": { "flag-c": "#;

/// In-memory fetcher whose content and behavior can be changed between cycles.
#[derive(Default)]
pub struct ScriptedFetcher {
    contents: Mutex<SourceContents>,
    extra: Mutex<Option<String>>,
    transport_down: AtomicBool,
    panic_next: AtomicBool,
    calls: AtomicU64,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, source_id: &str, content: &str) {
        self.contents
            .lock()
            .unwrap()
            .insert(source_id.to_string(), content.to_string());
    }

    pub fn remove(&self, source_id: &str) {
        self.contents.lock().unwrap().remove(source_id);
    }

    /// Fail every fetch with a transport error while `down`.
    pub fn set_transport_down(&self, down: bool) {
        self.transport_down.store(down, Ordering::SeqCst);
    }

    /// Return content for a source nobody requested.
    pub fn inject_unexpected(&self, source_id: &str) {
        *self.extra.lock().unwrap() = Some(source_id.to_string());
    }

    pub fn panic_on_next_fetch(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, source_ids: &[String], scope: &str) -> FetchResult<SourceContents> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("scripted fetcher panic");
        }
        if self.transport_down.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("connection refused".into()));
        }

        let contents = self.contents.lock().unwrap();
        let mut fetched = SourceContents::new();
        for id in source_ids {
            let content = contents.get(id).ok_or_else(|| FetchError::MissingSource {
                source_id: id.clone(),
                scope: scope.to_string(),
            })?;
            fetched.insert(id.clone(), content.clone());
        }
        if let Some(extra) = self.extra.lock().unwrap().as_ref() {
            fetched.insert(extra.clone(), "{}".to_string());
        }
        Ok(fetched)
    }
}

/// A boolean flag reader over `sources` in scope `myapp`.
pub fn flag_reader(
    fetcher: Arc<ScriptedFetcher>,
    sources: &[&str],
    skip_budget: u32,
) -> (Arc<Reader<bool>>, Arc<Store<bool>>) {
    let store = Arc::new(Store::new());
    let parser = Parser::new("feature-flags", Uniform::<bool>::new(), MissingTypePolicy::SkipAndCount);
    let reader = Reader::new(
        sources.iter().map(|s| s.to_string()).collect(),
        "myapp",
        fetcher,
        parser,
        store.clone(),
        skip_budget,
    );
    (Arc::new(reader), store)
}

pub fn ctx(pairs: &[(&str, &str)]) -> ConfigurationContext {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

/// Reader whose every cycle takes `delay` and publishes nothing.
pub struct SlowReader {
    delay: Duration,
    started: AtomicU64,
    finished: AtomicU64,
}

impl SlowReader {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: AtomicU64::new(0),
            finished: AtomicU64::new(0),
        })
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> u64 {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Refresh for SlowReader {
    fn name(&self) -> &str {
        "test/slow"
    }

    async fn execute(&self) -> Result<CycleOutcome, ReadError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(CycleOutcome::Skipped)
    }

    fn reset(&self) {}
}
