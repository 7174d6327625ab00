//! Graceful shutdown with signal handling

use crate::service::Service;
use crate::RuntimeState;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vex_core::{Error, Result};

/// Future resolving on the first SIGINT or SIGTERM (Ctrl+C elsewhere).
///
/// Handlers are installed before this returns, so a signal delivered while
/// the service is still binding is not lost.
pub fn os_signal() -> io::Result<impl Future<Output = ()> + Send + 'static> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        Ok(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
        })
    }

    #[cfg(not(unix))]
    {
        Ok(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C"),
                Err(err) => {
                    tracing::error!(error = %err, "Failed to listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
            }
        })
    }
}

/// Stops a service when its trigger fires
#[derive(Debug)]
pub struct SignalHandler {
    service: Arc<Service>,
    deadline: Duration,
    cancel: CancellationToken,
}

impl SignalHandler {
    /// Create a new signal handler. Cancelling `cancel` makes [`run`] return
    /// without stopping anything.
    ///
    /// [`run`]: SignalHandler::run
    pub fn new(service: Arc<Service>, deadline: Duration, cancel: CancellationToken) -> Self {
        Self {
            service,
            deadline,
            cancel,
        }
    }

    /// Wait for `trigger`, then stop the service and report the drain
    /// outcome
    pub async fn run<F>(self, trigger: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            _ = trigger => {}
        }

        info!("Shutting down...");

        tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            _ = self.service.wait_until_started() => {}
        }

        if self.service.state() == RuntimeState::Stopped {
            return Ok(());
        }

        self.service.stop(self.deadline).await
    }
}

/// Serve `service` until `trigger` fires, then drain within `deadline`.
///
/// The signal task is joined before returning, so its outcome is never
/// lost. A serving error takes precedence over a shutdown error.
pub async fn serve_until<F>(service: Arc<Service>, deadline: Duration, trigger: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let signals = tokio::spawn(
        SignalHandler::new(Arc::clone(&service), deadline, cancel.clone()).run(trigger),
    );

    let served = service.start().await;
    cancel.cancel();

    let stopped = match signals.await {
        Ok(outcome) => outcome,
        Err(err) => Err(Error::Runtime(format!("signal task failed: {}", err))),
    };

    served.and(stopped)
}
