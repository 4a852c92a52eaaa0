//! Termination signals for the leader.

use crate::error::SupervisorError;
use std::future::Future;

/// Resolves on the first SIGINT or SIGTERM (Ctrl-C elsewhere).
///
/// Handlers are installed before this returns, so a signal arriving while
/// workers are still being spawned is not lost.
pub fn termination() -> Result<impl Future<Output = ()>, SupervisorError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt()).map_err(SupervisorError::Signal)?;
        let mut terminate = signal(SignalKind::terminate()).map_err(SupervisorError::Signal)?;
        Ok(async move {
            tokio::select! {
                _ = interrupt.recv() => tracing::debug!("received SIGINT"),
                _ = terminate.recv() => tracing::debug!("received SIGTERM"),
            }
        })
    }

    #[cfg(not(unix))]
    {
        Ok(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for Ctrl-C: {err}");
                std::future::pending::<()>().await;
            }
        })
    }
}
