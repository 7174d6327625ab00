//! Service lifecycle: validation, serving and graceful shutdown

use crate::endpoints::service_router;
use crate::handler::RequestHandler;
use crate::listener::LimitListener;
use crate::RuntimeState;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn, Dispatch};
use vex_config::{resolve_listen_addr, validate_config, ServiceConfig};
use vex_core::{Error, Handler, Result};
use vex_queue::SubmissionQueue;

/// Sent by [`Service::stop`] to the serving loop
#[derive(Debug)]
struct ShutdownRequest {
    deadline: Duration,
    reply: oneshot::Sender<Result<()>>,
}

/// An HTTP service bound to one address.
///
/// Lifecycle: `Unstarted → Validated → Serving → Draining → Stopped`.
/// [`Service::start`] serves until [`Service::stop`] is called from another
/// task or the listener fails; `Stopped` is terminal.
pub struct Service {
    config: ServiceConfig,
    handler: Option<Arc<dyn Handler>>,
    logger: Option<Dispatch>,
    queue: Option<Arc<SubmissionQueue>>,
    state: watch::Sender<RuntimeState>,
    server: Mutex<Option<oneshot::Sender<ShutdownRequest>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("config", &self.config)
            .field("handler", &self.handler)
            .field("has_logger", &self.logger.is_some())
            .field("state", &self.state())
            .field("local_addr", &self.serving_addr())
            .finish()
    }
}

impl Service {
    /// Create the submission service: owns a fresh queue and the route table
    /// for the probes and the queue endpoints.
    pub fn new(config: ServiceConfig, logger: Dispatch) -> Result<Self> {
        let queue = Arc::new(SubmissionQueue::new());
        let router = service_router(Arc::clone(&queue))?;

        let mut service = Self::with_handler(config, Some(Arc::new(router)), Some(logger));
        service.queue = Some(queue);
        Ok(service)
    }

    /// Create a service around an arbitrary handler. Missing parts are
    /// reported by [`Service::validate`].
    pub fn with_handler(
        config: ServiceConfig,
        handler: Option<Arc<dyn Handler>>,
        logger: Option<Dispatch>,
    ) -> Self {
        let (state, _) = watch::channel(RuntimeState::Unstarted);

        Self {
            config,
            handler,
            logger,
            queue: None,
            state,
            server: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Service configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Queue owned by a service built with [`Service::new`]
    pub fn queue(&self) -> Option<&Arc<SubmissionQueue>> {
        self.queue.as_ref()
    }

    /// Current lifecycle state
    pub fn state(&self) -> RuntimeState {
        *self.state.borrow()
    }

    /// Address the listener is bound to, once serving has begun
    pub fn serving_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Wait until the service has left the pre-serving states.
    ///
    /// Returns the bound address, or `None` if the service stopped without
    /// ever binding.
    pub async fn wait_until_started(&self) -> Option<SocketAddr> {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(|s| *s >= RuntimeState::Serving).await;
        self.serving_addr()
    }

    /// Check that the service can be started. Has no side effect beyond
    /// moving an unstarted service to `Validated`.
    pub fn validate(&self) -> Result<()> {
        if self.handler.is_none() {
            return Err(Error::MissingHandler);
        }
        if self.logger.is_none() {
            return Err(Error::MissingLogger);
        }
        validate_config(&self.config)?;

        self.state.send_if_modified(|state| {
            if *state == RuntimeState::Unstarted {
                *state = RuntimeState::Validated;
                true
            } else {
                false
            }
        });

        Ok(())
    }

    /// Bind and serve until stopped.
    ///
    /// A close requested through [`Service::stop`] is not an error; the drain
    /// outcome is reported to the caller of `stop`. A bind or fatal accept
    /// failure is returned here.
    pub async fn start(&self) -> Result<()> {
        self.validate()?;

        let handler = self.handler.clone().ok_or(Error::MissingHandler)?;
        let logger = self.logger.clone().ok_or(Error::MissingLogger)?;
        let addr = resolve_listen_addr(&self.config.listen)?;

        let shutdown_rx = self.install_server()?;

        let result = self
            .serve(addr, handler, shutdown_rx)
            .with_subscriber(logger)
            .await;

        if result.is_err() {
            self.server.lock().take();
        }
        self.state.send_replace(RuntimeState::Stopped);

        result
    }

    /// Stop accepting connections and wait up to `deadline` for in-flight
    /// requests. Connections still open at the deadline are aborted and
    /// [`Error::ShutdownTimeout`] is returned.
    pub async fn stop(&self, deadline: Duration) -> Result<()> {
        let server = self.server.lock().take().ok_or(Error::MissingServer)?;

        let (reply, outcome) = oneshot::channel();
        if server.send(ShutdownRequest { deadline, reply }).is_err() {
            // Serving loop already gone
            return Ok(());
        }

        outcome.await.unwrap_or(Ok(()))
    }

    fn install_server(&self) -> Result<oneshot::Receiver<ShutdownRequest>> {
        let mut server = self.server.lock();

        if server.is_some() || self.state() > RuntimeState::Validated {
            return Err(Error::Runtime(format!(
                "service cannot start from state {:?}",
                self.state()
            )));
        }

        let (tx, rx) = oneshot::channel();
        *server = Some(tx);
        Ok(rx)
    }

    async fn serve(
        &self,
        addr: SocketAddr,
        handler: Arc<dyn Handler>,
        mut shutdown_rx: oneshot::Receiver<ShutdownRequest>,
    ) -> Result<()> {
        let listener = LimitListener::bind(addr, self.config.max_connections).await?;
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock() = Some(local_addr);

        info!(
            listen = %local_addr,
            max_connections = listener.max_connections(),
            "Service listening"
        );
        self.state.send_replace(RuntimeState::Serving);

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.read_header_timeout);

        let request_handler = RequestHandler::new(handler, self.config.max_body_size);
        let graceful = GracefulShutdown::new();
        let mut connections = JoinSet::new();

        let request = loop {
            tokio::select! {
                biased;

                request = &mut shutdown_rx => break request.ok(),

                accepted = listener.accept() => {
                    let (stream, remote) = accepted?;
                    debug!(remote_addr = %remote, "Accepted connection");

                    let handler = request_handler.clone();
                    let service = service_fn(move |req| {
                        let handler = handler.clone();
                        async move { Ok::<_, Infallible>(handler.handle(req, remote).await) }
                    });

                    let conn = graceful.watch(builder.serve_connection(TokioIo::new(stream), service));
                    connections.spawn(
                        async move {
                            if let Err(err) = conn.await {
                                debug!(remote_addr = %remote, error = %err, "Connection closed with error");
                            }
                        }
                        .with_current_subscriber(),
                    );
                }

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            error!(error = %err, "Connection task panicked");
                        }
                    }
                }
            }
        };

        self.state.send_replace(RuntimeState::Draining);
        drop(listener);

        let deadline = request
            .as_ref()
            .map_or(self.config.shutdown_timeout, |r| r.deadline);

        info!(
            open_connections = connections.len(),
            deadline = ?deadline,
            "Draining connections"
        );

        let outcome = match tokio::time::timeout(deadline, graceful.shutdown()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(
                    open_connections = connections.len(),
                    "Shutdown deadline exceeded, aborting connections"
                );
                connections.abort_all();
                Err(Error::ShutdownTimeout(deadline))
            }
        };

        while connections.join_next().await.is_some() {}

        info!(
            requests = request_handler.request_count(),
            "Service stopped"
        );
        self.state.send_replace(RuntimeState::Stopped);

        match request {
            Some(request) => {
                let _ = request.reply.send(outcome);
                Ok(())
            }
            None => outcome,
        }
    }
}
