//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default listen address: every interface, port 8080
pub const DEFAULT_LISTEN: &str = ":8080";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Listen address (`host:port`, `:port`, or a resolvable name)
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Maximum simultaneously open client connections.
    ///
    /// Sized as anticipated request rate times request duration; paired with
    /// `read_header_timeout` so idle clients cannot pin a slot forever.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Deadline for a client to finish sending request headers
    #[serde(default = "default_read_header_timeout", with = "humantime_serde")]
    pub read_header_timeout: Duration,

    /// Graceful shutdown timeout (wait for in-flight requests)
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Max request body size (bytes)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_max_connections() -> usize {
    50
}

fn default_read_header_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1 MiB
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_connections: default_max_connections(),
            read_header_timeout: default_read_header_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}
