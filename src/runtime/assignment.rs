//! Deployment assignment metadata.
//!
//! An assignment describes the site a host generation was provisioned for:
//! identity, environment snapshot, and when the deployment last changed.
//! The host consumes it read-only; producing it belongs to the platform
//! controller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known environment key holding the site's zip package URL.
pub const ZIP_URL_SETTING: &str = "SITE_ZIP_PACKAGE_URL";

/// Read-only deployment context for one site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentContext {
    /// Numeric site identifier.
    pub site_id: i64,
    /// Site name.
    pub site_name: String,
    /// Environment variable snapshot for the site.
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Last deployment change, Unix epoch milliseconds.
    pub last_modified_time: u64,
}

impl AssignmentContext {
    /// Create an assignment for a site.
    pub fn new(site_id: i64, site_name: impl Into<String>) -> Self {
        Self {
            site_id,
            site_name: site_name.into(),
            environment: HashMap::new(),
            last_modified_time: 0,
        }
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// The site's zip package URL, or the empty string when the setting is
    /// absent. Absence is not an error.
    pub fn zip_url(&self) -> String {
        self.environment
            .get(ZIP_URL_SETTING)
            .cloned()
            .unwrap_or_default()
    }
}
