//! Configuration for the probe.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tran_core::TcpClient;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Connection settings.
    pub client: ClientConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or IP address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Wrap the connection in TLS.
    pub enable_tls: bool,
    /// PEM file with the certificates to trust. Empty uses the webpki roots.
    pub cert_file: String,
    /// Accept any server certificate.
    pub insecure_skip_verify: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 9000,
            enable_tls: false,
            cert_file: String::new(),
            insecure_skip_verify: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ProbeConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

impl ClientConfig {
    /// Build an unconnected client from these settings.
    pub fn to_client(&self) -> TcpClient {
        TcpClient::new(
            self.host.clone(),
            self.port,
            self.enable_tls,
            self.cert_file.clone(),
            self.insecure_skip_verify,
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use tran_core::Client;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ProbeConfig::default()).unwrap();
        assert!(text.contains("[client]"));
        assert!(text.contains("port = 9000"));
        assert!(text.contains("level"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: ProbeConfig = toml::from_str("[client]\nport = 7000\nenable_tls = true\n").unwrap();
        assert_eq!(cfg.client.port, 7000);
        assert!(cfg.client.enable_tls);
        assert_eq!(cfg.client.host, "localhost");
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = ProbeConfig::load(Path::new("/no/such/tran-probe.toml"));
        assert_eq!(cfg.client.port, 9000);
    }

    #[test]
    fn write_then_load() {
        let path = std::env::temp_dir().join(format!("tran-probe-{}.toml", std::process::id()));
        ProbeConfig::write_default(&path).unwrap();
        let cfg = ProbeConfig::load(&path);
        assert_eq!(cfg.client.host, "localhost");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn to_client_carries_settings() {
        let mut cfg = ClientConfig::default();
        cfg.host = "example.org".into();
        cfg.port = 4443;
        cfg.enable_tls = true;
        let client = cfg.to_client();
        assert_eq!(client.host(), "example.org");
        assert_eq!(client.port(), 4443);
        assert!(client.tls_enabled());
        assert!(client.is_closed());
    }
}
