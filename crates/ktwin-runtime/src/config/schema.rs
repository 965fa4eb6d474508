//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ktwin_core::{DEFAULT_NAMESPACE, SNAPSHOT_FILE};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KtwinConfig {
    /// Service identity and graph loading.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Inbound CloudEvents server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Collaborator base URLs (live mode).
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Outbound request policy.
    #[serde(default)]
    pub http: HttpConfig,

    /// Static graph used in local and test modes.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Service
// =============================================================================

/// Where the collaborators of a service live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mode {
    /// Graph service, event store and broker over HTTP.
    #[default]
    Live,
    /// Static graph, in-memory store, loopback broker.
    Local,
    /// Same collaborators as [`Mode::Local`].
    Test,
}

impl Mode {
    /// Returns the mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Local => "local",
            Self::Test => "test",
        }
    }

    /// Returns `true` when no collaborator is reached over the network.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Local | Self::Test)
    }
}

impl From<String> for Mode {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "local" => Self::Local,
            "test" => Self::Test,
            _ => Self::Live,
        }
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service identity and graph loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Namespace of every type string.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Collaborator mode (`ENV` in existing deployments).
    #[serde(default)]
    pub mode: Mode,

    /// Instances or interfaces whose graph fragments are loaded.
    #[serde(default)]
    pub seed_instances: Vec<String>,

    /// Load the graph before accepting requests.
    #[serde(default)]
    pub preload_graph: bool,

    /// Where the merged graph is written in live mode. Empty disables it.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            namespace: default_namespace(),
            mode: Mode::default(),
            seed_instances: Vec::new(),
            preload_graph: false,
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl ServiceConfig {
    /// Returns the snapshot path, unless it is unset or empty.
    pub fn snapshot(&self) -> Option<&PathBuf> {
        self.snapshot_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

fn default_service_name() -> String {
    "ktwin-service".to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_snapshot_path() -> Option<PathBuf> {
    Some(PathBuf::from(SNAPSHOT_FILE))
}

// =============================================================================
// Server
// =============================================================================

/// Inbound CloudEvents server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path accepting events.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/".to_string()
}

// =============================================================================
// Endpoints & HTTP
// =============================================================================

/// Collaborator base URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Graph service (`KTWIN_GRAPH_URL`).
    #[serde(default)]
    pub graph_url: Option<String>,

    /// Event store (`KTWIN_EVENT_STORE`).
    #[serde(default)]
    pub event_store_url: Option<String>,

    /// Broker (`KTWIN_BROKER`).
    #[serde(default)]
    pub broker_url: Option<String>,
}

/// Outbound request policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retry a failed GET once.
    #[serde(default)]
    pub retry_reads: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_reads: false,
        }
    }
}

impl HttpConfig {
    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Static graph settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Graph JSON (`KTWIN_GRAPH`).
    #[serde(default)]
    pub static_graph: Option<String>,
}

impl GraphConfig {
    /// Returns the graph JSON, unless it is unset or blank.
    pub fn static_json(&self) -> Option<&str> {
        self.static_graph
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line output.
    #[default]
    Compact,
    /// Default tracing-subscriber output.
    Full,
    /// Multi-line output.
    Pretty,
    /// JSON lines (requires the `json-log` feature).
    Json,
}

/// Destination of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// The file at `logging.file_path`.
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used with [`LogOutput::File`].
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-target levels, e.g. `ktwin_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            filters: HashMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_string() {
        assert_eq!(Mode::from("local".to_string()), Mode::Local);
        assert_eq!(Mode::from("TEST".to_string()), Mode::Test);
        assert_eq!(Mode::from("production".to_string()), Mode::Live);
        assert_eq!(Mode::from(String::new()), Mode::Live);
    }

    #[test]
    fn test_empty_snapshot_path_disables_snapshot() {
        let mut service = ServiceConfig::default();
        assert_eq!(service.snapshot(), Some(&PathBuf::from(SNAPSHOT_FILE)));

        service.snapshot_path = Some(PathBuf::new());
        assert!(service.snapshot().is_none());
    }
}
