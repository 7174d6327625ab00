//! Vex CLI

mod logging;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use logging::LogRouting;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vex_config::{load_config, resolve_listen_addr, ConfigBuilder, ServiceConfig};
use vex_core::Error;
use vex_runtime::{os_signal, serve_until, Service};

#[derive(Parser)]
#[command(name = "vex")]
#[command(about = "Run arbitrary code under isolated environments")]
#[command(long_about = "Vex is a virtual execution micro-service that runs arbitrary code \
in the cloud under controlled, isolated environments.\n\
Documentation is available at https://github.com/moderncode-source/vex-svc")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Args)]
struct ServeArgs {
    /// Path to configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run Vex with debug logs
    #[arg(short, long)]
    verbose: bool,

    /// The TCP network address for the Vex server to listen on [default: :8080]
    #[arg(long)]
    addr: Option<String>,

    /// Log routing: 0 silent, 1 service only, 2 CLI only, 3 both
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=3))]
    log_level: u8,

    /// Seconds to wait for in-flight requests on shutdown
    #[arg(long)]
    shutdown_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and resolve the listen address
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address override
        #[arg(long)]
        addr: Option<String>,
    },

    /// Print the version number of Vex
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => serve(cli.serve).await,

        Some(Commands::Validate { config, addr }) => {
            tracing_subscriber::fmt().with_target(false).init();

            match service_config(config.as_deref(), addr, None) {
                Ok(cfg) => {
                    let resolved = resolve_listen_addr(&cfg.listen)?;
                    info!("✓ Configuration is valid");
                    info!("  Listen: {} ({})", cfg.listen, resolved);
                    info!("  Max connections: {}", cfg.max_connections);
                    info!("  Read header timeout: {:?}", cfg.read_header_timeout);
                    info!("  Shutdown timeout: {:?}", cfg.shutdown_timeout);
                    info!("  Max body size: {} bytes", cfg.max_body_size);
                    Ok(())
                }
                Err(e) => {
                    error!("✗ Configuration validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Some(Commands::Version) => {
            println!("Vex Core Version: v{}", vex_runtime::VERSION);
            println!("Vex CLI Version: v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let logging = logging::init(args.verbose, LogRouting::from_level(args.log_level))?;

    info!("Welcome to Vex - a virtual execution micro-service");

    let config = service_config(args.config.as_deref(), args.addr, args.shutdown_timeout)?;
    let deadline = config.shutdown_timeout;

    let service = Service::new(config, logging.service_logger()).map_err(|err| {
        error!(error = %err, "Service creation error");
        err
    })?;

    if let Err(err) = service.validate() {
        error!(error = %err, "Service error");
        return Err(err).context("service error");
    }

    let pid = std::process::id();
    info!("Starting service process [{}] (Press CTRL+C to quit)", pid);

    let signal = os_signal().context("failed to install signal handlers")?;
    let result = serve_until(Arc::new(service), deadline, signal).await;

    let dropped = logging.dropped_service_lines();
    if dropped > 0 {
        warn!(dropped, "Service dropped {} logs", dropped);
    }

    match result {
        Ok(()) => {
            info!("Service shutdown complete");
            info!("Finished service process [{}]", pid);
            Ok(())
        }
        Err(err @ Error::ShutdownTimeout(_)) => {
            error!(error = %err, "Service shutdown error");
            Err(err).context("service shutdown error")
        }
        Err(err) => {
            error!(error = %err, "Service start error");
            Err(err).context("service start error")
        }
    }
}

/// File values (or defaults) with command-line overrides applied
fn service_config(
    path: Option<&Path>,
    addr: Option<String>,
    shutdown_timeout: Option<u64>,
) -> Result<ServiceConfig> {
    let base = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    let mut builder = ConfigBuilder::from_config(base);
    if let Some(addr) = addr {
        builder = builder.listen(addr);
    }
    if let Some(secs) = shutdown_timeout {
        builder = builder.shutdown_timeout(Duration::from_secs(secs));
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "vex",
            "-v",
            "--addr",
            "127.0.0.1:9000",
            "--log-level",
            "1",
            "--shutdown-timeout",
            "5",
        ])
        .unwrap();

        assert!(cli.command.is_none());
        assert!(cli.serve.verbose);
        assert_eq!(cli.serve.addr.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(cli.serve.log_level, 1);
        assert_eq!(cli.serve.shutdown_timeout, Some(5));
    }

    #[test]
    fn test_log_level_range() {
        assert!(Cli::try_parse_from(["vex", "--log-level", "4"]).is_err());

        let cli = Cli::try_parse_from(["vex"]).unwrap();
        assert_eq!(cli.serve.log_level, 3);
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::try_parse_from(["vex", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Version)));

        let cli = Cli::try_parse_from(["vex", "validate", "--addr", ":9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Validate { addr: Some(ref a), .. }) if a == ":9000"
        ));
    }

    #[test]
    fn test_default_config() {
        let config = service_config(None, None, None).unwrap();
        assert_eq!(config.listen, ":8080");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "listen: \"127.0.0.1:7000\"\nmax_connections: 5").unwrap();

        let config = service_config(Some(file.path()), None, None).unwrap();
        assert_eq!(config.listen, "127.0.0.1:7000");
        assert_eq!(config.max_connections, 5);

        let config =
            service_config(Some(file.path()), Some(":9000".to_string()), Some(2)).unwrap();
        assert_eq!(config.listen, ":9000");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(service_config(None, Some("no-port".to_string()), None).is_err());
    }
}
