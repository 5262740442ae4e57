//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! namespace = "analytics"   # default lineage namespace
//!
//! [client]                  # lineage server connection
//! url = "http://localhost:5000"
//! timeout_secs = 30
//!
//! [location]                # where job source files are browsable
//! repository_url = "https://github.com/acme/dags"
//! revision = "main"
//! root = "/srv/airflow/dags"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Namespace used when neither the DAG nor the config names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Owner used when a DAG's default args name none.
pub const DEFAULT_OWNER: &str = "anonymous";

/// Lineage server URL used when none is configured.
pub const DEFAULT_URL: &str = "http://localhost:5000";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    /// Default namespace for jobs and datasets.
    pub namespace: Option<String>,

    /// Lineage server connection.
    pub client: Option<ClientSection>,

    /// Source-location settings.
    pub location: Option<LocationSection>,
}

impl LineageConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: LineageConfig) {
        if other.namespace.is_some() {
            self.namespace = other.namespace;
        }

        match (&mut self.client, other.client) {
            (Some(mine), Some(theirs)) => mine.merge(theirs),
            (slot @ None, Some(theirs)) => *slot = Some(theirs),
            _ => {}
        }

        if other.location.is_some() {
            self.location = other.location;
        }
    }

    /// Namespace to register under, falling back to [`DEFAULT_NAMESPACE`].
    pub fn namespace(&self) -> &str {
        self.namespace
            .as_deref()
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Effective client settings, with defaults for anything unset.
    pub fn client(&self) -> ClientSection {
        self.client.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Lineage server connection settings (`[client]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Base URL of the lineage server.
    pub url: String,

    /// Bearer token sent with every request.
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientSection {
    fn merge(&mut self, other: ClientSection) {
        let defaults = ClientSection::default();
        if other.url != defaults.url {
            self.url = other.url;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.timeout_secs != defaults.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether an API key is stored in the config file itself.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Location
// ─────────────────────────────────────────────────────────────────────────────

/// Where DAG source files can be browsed (`[location]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSection {
    /// Repository web URL, e.g. `https://github.com/acme/dags`.
    pub repository_url: String,

    /// Branch, tag, or commit the DAG files are served from.
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Local checkout root; absolute DAG file paths are made relative to it.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

fn default_revision() -> String {
    "main".to_string()
}
