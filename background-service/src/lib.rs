pub mod session;

use clip_core::{log_channels, CoreError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use session::{
    comment_text, pacing_delay, CycleReport, Session, SessionOptions, SessionTiming,
};

/// Runs one [`Session`] on a background task.
///
/// A supervisor task waits on the worker and logs how it ended. A worker that
/// panics is reported on the error channel and is not restarted.
pub struct BackgroundService {
    stop_tx: watch::Sender<bool>,
    supervisor: JoinHandle<()>,
}

impl BackgroundService {
    pub fn start(session: Session) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = tokio::spawn(session.run(stop_rx));

        let supervisor = tokio::spawn(async move {
            match worker.await {
                Ok(()) => info!(target: log_channels::SESSION, "Session worker has exited"),
                Err(e) if e.is_panic() => error!(
                    target: log_channels::ERRORS,
                    "Session worker stopped unexpectedly: {}", e
                ),
                Err(e) => warn!(
                    target: log_channels::SESSION,
                    "Session worker was cancelled: {}", e
                ),
            }
        });

        info!(target: log_channels::SESSION, "Background service started");
        Self {
            stop_tx,
            supervisor,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.supervisor.is_finished()
    }

    /// Asks the worker to stop and waits for it. An upload or download in
    /// flight finishes first.
    pub async fn stop(self) -> Result<(), CoreError> {
        info!(target: log_channels::SESSION, "Stopping background service");
        // Fails only when the worker is already gone
        let _ = self.stop_tx.send(true);

        self.supervisor.await.map_err(|e| CoreError::Internal {
            message: format!("service supervisor failed: {}", e),
        })
    }
}
