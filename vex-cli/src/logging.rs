//! CLI and service loggers
//!
//! The CLI logs human-readable lines through the global subscriber. The
//! service gets its own JSON subscriber writing through a lossy non-blocking
//! buffer, so a slow terminal never stalls request handling.

use anyhow::Result;
use tracing::{Dispatch, Level};
use tracing_appender::non_blocking::{ErrorCounter, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Lines the service writer buffers before it starts dropping
const SERVICE_BUFFERED_LINES: usize = 100;

/// Which loggers produce output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRouting {
    /// Both loggers discard everything
    Silent,
    /// Only the service logs
    ServiceOnly,
    /// Only the CLI logs
    CliOnly,
    /// Both log
    Both,
}

impl LogRouting {
    /// Map a `--log-level` value: 0 silent, 1 service, 2 CLI, 3 both
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => LogRouting::Silent,
            1 => LogRouting::ServiceOnly,
            2 => LogRouting::CliOnly,
            _ => LogRouting::Both,
        }
    }

    fn cli(self) -> bool {
        matches!(self, LogRouting::CliOnly | LogRouting::Both)
    }

    fn service(self) -> bool {
        matches!(self, LogRouting::ServiceOnly | LogRouting::Both)
    }
}

/// Installed loggers. Keep alive until the service has stopped so buffered
/// service lines are flushed.
#[derive(Debug)]
pub struct Logging {
    service: Dispatch,
    dropped: Option<ErrorCounter>,
    _guard: Option<WorkerGuard>,
}

impl Logging {
    /// Logger to hand to the service
    pub fn service_logger(&self) -> Dispatch {
        self.service.clone()
    }

    /// Service log lines dropped because the buffer was full
    pub fn dropped_service_lines(&self) -> usize {
        self.dropped.as_ref().map_or(0, ErrorCounter::dropped_lines)
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::from_default_env().add_directive(level.into())
}

/// Install the CLI logger as the global default and build the service logger
pub fn init(verbose: bool, routing: LogRouting) -> Result<Logging> {
    if routing.cli() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_level(true),
            )
            .with(env_filter(verbose))
            .try_init()?;
    }

    if !routing.service() {
        return Ok(Logging {
            service: Dispatch::none(),
            dropped: None,
            _guard: None,
        });
    }

    let (writer, guard) = NonBlockingBuilder::default()
        .lossy(true)
        .buffered_lines_limit(SERVICE_BUFFERED_LINES)
        .finish(std::io::stderr());
    let dropped = writer.error_counter();

    let service = tracing_subscriber::fmt()
        .json()
        .with_writer(writer)
        .with_env_filter(env_filter(verbose))
        .finish();

    Ok(Logging {
        service: Dispatch::new(service),
        dropped: Some(dropped),
        _guard: Some(guard),
    })
}
