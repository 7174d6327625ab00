//! Configuration builder

use crate::types::ServiceConfig;
use std::time::Duration;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: ServiceConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder seeded with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Set listen address
    pub fn listen(mut self, addr: impl Into<String>) -> Self {
        self.config.listen = addr.into();
        self
    }

    /// Set the connection limit
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Set the header read deadline
    pub fn read_header_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_header_timeout = timeout;
        self
    }

    /// Set the graceful shutdown deadline
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Set the request body limit
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.config.max_body_size = bytes;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> vex_core::Result<ServiceConfig> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}
