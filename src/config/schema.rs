//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (host, port, limits).
    pub listener: ListenerConfig,

    /// Certificate material. When present the bootstrap extension reports
    /// a configured certificate and sessions are upgraded to TLS.
    pub tls: Option<TlsConfig>,

    /// Where extensions are loaded from.
    pub extensions: ExtensionsConfig,

    /// Request line protocol settings.
    pub protocol: ProtocolConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host name resolved to the bind address (first IPv4 entry wins).
    pub host: String,

    /// Listening port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Upper bound on waiting for one request line.
    pub read_timeout_secs: u64,

    /// Upper bound on the TLS handshake.
    pub handshake_timeout_secs: u64,

    /// Longest accepted request line, newline included.
    pub max_line_bytes: usize,
}

impl ListenerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            max_connections: 1_024,
            read_timeout_secs: 30,
            handshake_timeout_secs: 10,
            max_line_bytes: 8 * 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain (PEM).
    pub cert_path: PathBuf,

    /// Path to private key (PEM).
    pub key_path: PathBuf,
}

/// Extension loading configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Host root; the bootstrap unit and the modules directory are relative to it.
    pub root: PathBuf,

    /// Bootstrap unit path relative to `root`, without the unit extension.
    pub bootstrap: String,

    /// Modules directory relative to `root`, reported by the bootstrap extension.
    pub directory: String,

    /// File extension of code units.
    pub unit_extension: String,

    /// Modules added by the bootstrap extension when the server starts.
    pub autoload: Vec<String>,

    /// Hot-reload registered modules when their unit file changes.
    pub watch: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            bootstrap: "System/Startup".to_string(),
            directory: "Modules".to_string(),
            unit_extension: "ext".to_string(),
            autoload: Vec::new(),
            watch: false,
        }
    }
}

impl ExtensionsConfig {
    /// Full path of the bootstrap unit.
    pub fn bootstrap_path(&self) -> PathBuf {
        self.root
            .join(format!("{}.{}", self.bootstrap, self.unit_extension))
    }
}

/// How the reply body is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// Indented JSON.
    #[default]
    Pretty,
    /// Single-line JSON.
    Compact,
}

/// Request line protocol settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub body_format: BodyFormat,

    /// Instruction paths that end the exchange without a reply.
    pub reserved_paths: Vec<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            body_format: BodyFormat::Pretty,
            reserved_paths: vec!["/favicon.ico".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
