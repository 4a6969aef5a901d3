//! "First load attempted" barrier.
//!
//! Opens once every registered reader has attempted one cycle, whether it
//! succeeded or not. Async waiters are woken through a `watch` channel,
//! blocking waiters through a `Condvar`; both are released together.
//! A loader that shuts down before every first attempt finished abandons the
//! barrier instead: waiters are released but the load is not complete.
//!
//! Do not block on this from the runtime thread that drives the refresh
//! tasks: the first cycles would never get to run.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug)]
struct BarrierState {
    remaining: usize,
    open: bool,
    abandoned: bool,
}

/// Completion barrier for the initial load.
#[derive(Debug)]
pub struct InitialLoadBarrier {
    state: Mutex<BarrierState>,
    opened: Condvar,
    signal: watch::Sender<bool>,
}

impl InitialLoadBarrier {
    /// A closed barrier waiting for `expected` first attempts.
    pub fn new(expected: usize) -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            state: Mutex::new(BarrierState {
                remaining: expected,
                open: false,
                abandoned: false,
            }),
            opened: Condvar::new(),
            signal,
        }
    }

    /// Whether every reader attempted its first cycle.
    pub fn is_complete(&self) -> bool {
        let state = self.lock();
        state.open && !state.abandoned
    }

    /// Whether waiters were released by a shutdown rather than a completed load.
    pub fn is_abandoned(&self) -> bool {
        self.lock().abandoned
    }

    /// Record one reader's first attempt. Opens the barrier on the last one.
    pub fn arrive(&self) {
        let mut state = self.lock();
        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            self.open_locked(&mut state);
        }
    }

    /// Open regardless of outstanding arrivals.
    pub fn open(&self) {
        let mut state = self.lock();
        self.open_locked(&mut state);
    }

    /// Release every waiter without completing the load. No-op once open.
    pub fn abandon(&self) {
        let mut state = self.lock();
        if state.open {
            return;
        }
        state.abandoned = true;
        state.open = true;
        self.signal.send_replace(true);
        self.opened.notify_all();
        tracing::warn!(remaining = state.remaining, "Initial configuration load abandoned");
    }

    /// Wait until the barrier opens or is abandoned. Dropping the future
    /// cancels the wait.
    pub async fn wait(&self) {
        let mut rx = self.signal.subscribe();
        // the sender lives as long as `self`, so this cannot observe a close
        let _ = rx.wait_for(|open| *open).await;
    }

    /// Block the current thread until the barrier opens, is abandoned, or
    /// `timeout` elapses.
    ///
    /// Returns whether waiters were released; check [`Self::is_complete`] to
    /// tell a finished load from a shutdown.
    pub fn wait_blocking(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .opened
            .wait_timeout_while(state, timeout, |state| !state.open)
            .unwrap_or_else(PoisonError::into_inner);
        state.open
    }

    fn open_locked(&self, state: &mut BarrierState) {
        if state.open {
            return;
        }
        state.open = true;
        self.signal.send_replace(true);
        self.opened.notify_all();
        tracing::info!("Initial configuration load complete");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
