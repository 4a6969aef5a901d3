//! Fixed-delay scheduling of readers.
//!
//! # Data Flow
//! ```text
//! start()
//!     → one task per reader, first cycle immediately
//!     → cycle: requests += 1 → reader.execute()
//!         → Err: failures += 1 (fault: stop this reader)
//!         → panic: failures += 1, recorded, task unwinds
//!     → first attempt of every reader opens the initial-load barrier
//!     → wait `refresh_interval` after completion, or a trigger, or shutdown
//!
//! shutdown()
//!     → broadcast stop → join within grace → abort the rest
//!     → release initial-load waiters if a first attempt never finished
//! ```
//!
//! # Design Decisions
//! - Readers never share a task: a slow fetch only delays its own domain
//! - The delay runs from the end of one cycle to the start of the next, so
//!   cycles of the same reader never overlap
//! - Each reader has its own trigger holding at most one pending permit, so a
//!   trigger that lands mid-cycle runs one more cycle right after it

pub mod barrier;

pub use barrier::InitialLoadBarrier;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::reader::Refresh;

/// Default delay between the end of one cycle and the start of the next.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Default time in-flight cycles get to finish on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Loader already started")]
    AlreadyStarted,

    #[error("Loader must be started from within a Tokio runtime")]
    NoRuntime,

    /// Readers that stopped on a fault or a panic.
    #[error("Readers stopped on faults: {}", .readers.join(", "))]
    SchedulingFault { readers: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    pub refresh_interval: Duration,
    pub shutdown_grace: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Scheduled cycle counters, summed over all readers.
#[derive(Debug, Default)]
pub struct LoaderMetrics {
    requests: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub requests: u64,
    pub failures: u64,
}

impl LoaderMetrics {
    fn record_request(&self, reader: &str) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        metrics::record_cycle(reader, "request");
    }

    fn record_failure(&self, reader: &str) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        metrics::record_cycle(reader, "failure");
    }

    pub fn snapshot(&self) -> LoaderStats {
        LoaderStats {
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Runs every registered reader on its own fixed-delay schedule.
pub struct Loader {
    readers: Vec<Arc<dyn Refresh>>,
    settings: LoaderSettings,
    metrics: Arc<LoaderMetrics>,
    barrier: Arc<InitialLoadBarrier>,
    triggers: Vec<Arc<Notify>>,
    faults: Arc<Mutex<Vec<String>>>,
    shutdown: Shutdown,
    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
    started: AtomicBool,
}

impl Loader {
    pub fn new(readers: Vec<Arc<dyn Refresh>>, settings: LoaderSettings) -> Self {
        let barrier = Arc::new(InitialLoadBarrier::new(readers.len()));
        let triggers = readers.iter().map(|_| Arc::new(Notify::new())).collect();
        Self {
            readers,
            settings,
            metrics: Arc::new(LoaderMetrics::default()),
            barrier,
            triggers,
            faults: Arc::new(Mutex::new(Vec::new())),
            shutdown: Shutdown::new(),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    pub fn reader_names(&self) -> Vec<String> {
        self.readers.iter().map(|r| r.name().to_string()).collect()
    }

    /// Spawn one refresh task per reader. The first cycles start immediately.
    pub fn start(&self) -> Result<(), LoaderError> {
        let handle = Handle::try_current().map_err(|_| LoaderError::NoRuntime)?;
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(LoaderError::AlreadyStarted);
        }

        if self.readers.is_empty() {
            self.barrier.open();
        }

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (reader, trigger) in self.readers.iter().zip(&self.triggers) {
            let task = RefreshTask {
                reader: reader.clone(),
                interval: self.settings.refresh_interval,
                metrics: self.metrics.clone(),
                barrier: self.barrier.clone(),
                trigger: trigger.clone(),
                faults: self.faults.clone(),
            };
            let stop = self.shutdown.subscribe();
            tasks.push((reader.name().to_string(), handle.spawn(task.run(stop))));
        }

        tracing::info!(
            readers = self.readers.len(),
            refresh_interval = ?self.settings.refresh_interval,
            "Configuration loader started"
        );
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_initial_load_complete(&self) -> bool {
        self.barrier.is_complete()
    }

    /// Shared handle to the initial-load barrier, for blocking waiters.
    pub fn initial_load(&self) -> Arc<InitialLoadBarrier> {
        self.barrier.clone()
    }

    /// Wait until every reader has attempted its first cycle, or the loader
    /// shut down before they could.
    pub async fn wait_for_initial_load(&self) {
        self.barrier.wait().await
    }

    /// Make every reader run a cycle now instead of waiting out its delay.
    ///
    /// A reader that is mid-cycle runs one more cycle as soon as the current
    /// one finishes. Triggers that pile up before then collapse into one.
    pub fn trigger_refresh(&self) {
        if !self.is_started() {
            return;
        }
        for trigger in &self.triggers {
            trigger.notify_one();
        }
    }

    /// Make every reader publish on its next cycle even if content is unchanged.
    pub fn reset_all(&self) {
        for reader in &self.readers {
            reader.reset();
        }
    }

    /// Readers that stopped on a fault or a panic.
    pub fn faulted_readers(&self) -> Vec<String> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn metrics(&self) -> &Arc<LoaderMetrics> {
        &self.metrics
    }

    pub fn stats(&self) -> LoaderStats {
        self.metrics.snapshot()
    }

    /// Stop scheduling, give in-flight cycles the grace period, then abort.
    ///
    /// Reports readers that stopped on a fault or a panic.
    pub async fn shutdown(&self) -> Result<(), LoaderError> {
        self.shutdown.trigger();

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let deadline = tokio::time::Instant::now() + self.settings.shutdown_grace;

        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_panic() => {
                    tracing::debug!(reader = %name, "Refresh task ended in a panic");
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    tracing::warn!(reader = %name, "Refresh task did not stop within grace period, aborting");
                    handle.abort();
                }
            }
        }

        // aborted first cycles never arrive
        self.barrier.abandon();

        let faulted = self.faulted_readers();
        if faulted.is_empty() {
            tracing::info!("Configuration loader stopped");
            Ok(())
        } else {
            Err(LoaderError::SchedulingFault { readers: faulted })
        }
    }
}

enum Verdict {
    Continue,
    Stop,
}

struct RefreshTask {
    reader: Arc<dyn Refresh>,
    interval: Duration,
    metrics: Arc<LoaderMetrics>,
    barrier: Arc<InitialLoadBarrier>,
    trigger: Arc<Notify>,
    faults: Arc<Mutex<Vec<String>>>,
}

impl RefreshTask {
    async fn run(self, mut stop: broadcast::Receiver<()>) {
        let mut first = true;
        loop {
            let verdict = AssertUnwindSafe(self.cycle()).catch_unwind().await;
            match &verdict {
                Ok(Verdict::Continue) => {}
                Ok(Verdict::Stop) => self.record_fault(),
                Err(_) => {
                    self.metrics.record_failure(self.reader.name());
                    self.record_fault();
                    tracing::error!(reader = %self.reader.name(), "Reader panicked, stopping its schedule");
                }
            }
            if std::mem::take(&mut first) {
                self.barrier.arrive();
            }

            match verdict {
                Ok(Verdict::Continue) => {}
                Ok(Verdict::Stop) => return,
                Err(panic) => std::panic::resume_unwind(panic),
            }

            tokio::select! {
                biased;
                _ = stop.recv() => break,
                _ = self.trigger.notified() => {
                    tracing::debug!(reader = %self.reader.name(), "Refresh triggered");
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::debug!(reader = %self.reader.name(), "Refresh task stopped");
    }

    async fn cycle(&self) -> Verdict {
        let name = self.reader.name();
        self.metrics.record_request(name);

        match self.reader.execute().await {
            Ok(outcome) => {
                tracing::debug!(reader = %name, outcome = ?outcome, "Refresh cycle finished");
                Verdict::Continue
            }
            Err(e) if e.is_fault() => {
                self.metrics.record_failure(name);
                tracing::error!(reader = %name, error = %e, "Reader faulted, stopping its schedule");
                Verdict::Stop
            }
            Err(e) => {
                self.metrics.record_failure(name);
                tracing::error!(reader = %name, error = %e, "Skipped updating configurations");
                Verdict::Continue
            }
        }
    }

    fn record_fault(&self) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.reader.name().to_string());
    }
}
