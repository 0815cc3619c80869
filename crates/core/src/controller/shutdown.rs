use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful-termination plumbing. A termination signal only cancels the
/// token; the supervisor owns the actual cleanup (disarming the watchdog)
/// on its way out of the loop, so every exit route runs it.
#[derive(Debug)]
pub struct ShutdownGuard {
    token: CancellationToken,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// The cancellation token the supervisory loop monitors.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn a background task that cancels the token on SIGTERM or SIGINT.
    pub fn spawn_signal_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                let sigterm = signal::unix::signal(signal::unix::SignalKind::terminate());
                let sigint = signal::unix::signal(signal::unix::SignalKind::interrupt());
                match (sigterm, sigint) {
                    (Ok(mut term), Ok(mut int)) => {
                        tokio::select! {
                            _ = term.recv() => tracing::info!("received SIGTERM"),
                            _ = int.recv() => tracing::info!("received SIGINT"),
                        }
                    }
                    _ => {
                        tracing::warn!("failed to register signal handlers");
                        return;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                let _ = signal::ctrl_c().await;
                tracing::info!("received Ctrl+C");
            }
            token.cancel();
        });
    }
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}
