//! Host configuration.

use crate::dispatch::routing::ResolutionMode;
use crate::runtime::assignment::AssignmentContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for the Strato host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Environment variables exposed to all functions.
    pub env: HashMap<String, String>,
    /// Whether to enable the health check endpoint.
    pub enable_health: bool,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Route resolution order used by the dispatcher.
    pub resolution_mode: ResolutionMode,
    /// Deployment assignment for this host generation, if provisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<AssignmentContext>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            env: HashMap::new(),
            enable_health: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
            resolution_mode: ResolutionMode::ProxyOverride,
            assignment: None,
        }
    }
}

impl HostConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the route resolution mode.
    pub fn resolution_mode(mut self, mode: ResolutionMode) -> Self {
        self.resolution_mode = mode;
        self
    }

    /// Attach the deployment assignment.
    pub fn assignment(mut self, assignment: AssignmentContext) -> Self {
        self.assignment = Some(assignment);
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Environment handed to function bodies: the assignment's snapshot
    /// seeded first, explicit host entries layered on top.
    pub fn function_env(&self) -> HashMap<String, String> {
        let mut env = self
            .assignment
            .as_ref()
            .map(|a| a.environment.clone())
            .unwrap_or_default();
        env.extend(self.env.clone());
        env
    }
}
