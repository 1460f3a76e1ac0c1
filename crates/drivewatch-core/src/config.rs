//! Configuration module for drivewatch.
//!
//! Typed configuration structs that map to the YAML configuration file,
//! with loading, validation and defaults. The configuration is loaded once
//! at startup and validated before anything else runs.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration for drivewatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    pub store: StoreConfig,
    pub subscriptions: SubscriptionsConfig,
    pub sync: SyncConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Provider credential settings.
///
/// The bearer credential is supplied externally; drivewatch never
/// refreshes it. Client and tenant ids identify the application
/// registration and are validated by GUID shape only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub bearer: String,
    pub client_id: String,
    pub tenant_id: String,
}

/// State store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string for the state store.
    pub dsn: String,
}

/// Push subscription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionsConfig {
    /// Minimum length for generated shared secrets.
    pub secret_floor: usize,
    /// Absolute URL at which the provider will POST notifications.
    pub notify_url: String,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Initial state of the credential gate.
    pub delta_enabled: bool,
    /// Emit UPDATE events for metadata-only changes. When off, the mirror
    /// row is still refreshed but no audit record is written.
    pub emit_update_events: bool,
    /// Capacity of the bounded notification job queue.
    pub queue_capacity: usize,
}

/// Inbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8480`.
    pub bind: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite://drivewatch.db".to_string(),
        }
    }
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            secret_floor: 32,
            notify_url: String::new(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delta_enabled: false,
            emit_update_events: false,
            queue_capacity: 64,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8480".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"provider.client_id"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Checks the `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` GUID shape.
fn is_guid_shaped(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    let lens = [8usize, 4, 4, 4, 12];
    parts.len() == 5
        && parts
            .iter()
            .zip(lens.iter())
            .all(|(p, len)| p.len() == *len && p.chars().all(|c| c.is_ascii_hexdigit()))
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- provider ---
        if self.provider.bearer.trim().is_empty() {
            errors.push(ValidationError {
                field: "provider.bearer".into(),
                message: "must not be empty".into(),
            });
        }
        if !is_guid_shaped(&self.provider.client_id) {
            errors.push(ValidationError {
                field: "provider.client_id".into(),
                message: format!("not GUID-shaped: '{}'", self.provider.client_id),
            });
        }
        if !is_guid_shaped(&self.provider.tenant_id) {
            errors.push(ValidationError {
                field: "provider.tenant_id".into(),
                message: format!("not GUID-shaped: '{}'", self.provider.tenant_id),
            });
        }

        // --- store ---
        if self.store.dsn.trim().is_empty() {
            errors.push(ValidationError {
                field: "store.dsn".into(),
                message: "must not be empty".into(),
            });
        }

        // --- subscriptions ---
        if self.subscriptions.secret_floor < 32 {
            errors.push(ValidationError {
                field: "subscriptions.secret_floor".into(),
                message: format!(
                    "must be at least 32, got {}",
                    self.subscriptions.secret_floor
                ),
            });
        }
        match url::Url::parse(&self.subscriptions.notify_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => errors.push(ValidationError {
                field: "subscriptions.notify_url".into(),
                message: format!(
                    "must be an absolute http(s) URL: '{}'",
                    self.subscriptions.notify_url
                ),
            }),
        }

        // --- sync ---
        if self.sync.queue_capacity == 0 {
            errors.push(ValidationError {
                field: "sync.queue_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- server ---
        if self.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: "server.bind".into(),
                message: format!("not a socket address: '{}'", self.server.bind),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }

    /// Load and validate in one step, collecting all validation errors
    /// into a single failure.
    pub fn load_validated(path: &Path) -> anyhow::Result<Self> {
        let config = Self::load(path)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            let summary = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::bail!("Invalid configuration: {summary}")
        }
    }
}
