//! OS signal handling.
//!
//! SIGINT and SIGTERM end the run; SIGHUP forces a re-publish.

/// What a received signal asks the process to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    Shutdown,
    Reload,
}

/// Wait for the next signal the process reacts to.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<SignalAction> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| SignalAction::Shutdown),
        _ = terminate.recv() => Ok(SignalAction::Shutdown),
        _ = hangup.recv() => Ok(SignalAction::Reload),
    }
}

#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<SignalAction> {
    tokio::signal::ctrl_c().await?;
    Ok(SignalAction::Shutdown)
}
