//! Configuration validation

use crate::ServiceConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use vex_core::{Error, Result};

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<()> {
    resolve_listen_addr(&config.listen)?;

    if config.max_connections == 0 {
        return Err(Error::Config("max_connections must be > 0".to_string()));
    }

    if config.read_header_timeout.is_zero() {
        return Err(Error::Config("read_header_timeout must be > 0".to_string()));
    }

    if config.shutdown_timeout.is_zero() {
        return Err(Error::Config("shutdown_timeout must be > 0".to_string()));
    }

    if config.shutdown_timeout.as_secs() > 300 {
        tracing::warn!("shutdown_timeout is very high (>5 minutes)");
    }

    if config.max_body_size == 0 {
        return Err(Error::Config("max_body_size must be > 0".to_string()));
    }

    Ok(())
}

/// Resolve a listen address into a socket address.
///
/// Accepts `host:port`, bracketed IPv6, names the system resolver knows, and
/// `:port` for every interface. An empty address binds every interface on an
/// ephemeral port.
pub fn resolve_listen_addr(addr: &str) -> Result<SocketAddr> {
    let invalid = |reason: String| Error::InvalidAddress {
        addr: addr.to_string(),
        reason,
    };

    if addr.is_empty() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0));
    }

    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|e| invalid(format!("invalid port '{port}': {e}")))?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        return Ok(socket_addr);
    }

    addr.to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no addresses found".to_string()))
}
