//! Device client interface.
//!
//! The reconciliation core talks to the switch through the narrow
//! [`DeviceClient`] trait: structured reads, one-shot config submission, and
//! two read-only precondition probes. All calls are synchronous
//! request/response; timeouts are the transport's responsibility.

pub mod nxapi;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default NX-API HTTPS port
const NXAPI_DEFAULT_HTTPS_PORT: u16 = 443;

/// Default NX-API HTTP port
const NXAPI_DEFAULT_HTTP_PORT: u16 = 80;

/// Default timeout for device requests (seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Whether an interface is switched or routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceLayer {
    Layer2,
    Layer3,
}

impl std::fmt::Display for InterfaceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterfaceLayer::Layer2 => write!(f, "layer2"),
            InterfaceLayer::Layer3 => write!(f, "layer3"),
        }
    }
}

/// Synchronous client for one NX-OS device.
///
/// Implementations raise [`Error::Transport`] for communication failures and
/// [`Error::CommandRejected`] when the device refuses a command; the two are
/// never conflated.
pub trait DeviceClient {
    /// Run a feature's `show` command and return its structured body, or
    /// `None` when the device reports no configuration for the entity.
    /// "Not configured" is a valid state, not a failure.
    fn read_feature_state(&self, command: &str) -> Result<Option<serde_json::Value>>;

    /// Submit an ordered command payload as one config RPC.
    fn submit(&self, payload: &str) -> Result<()>;

    /// Whether a feature (e.g. `pim`) is enabled on the device.
    fn feature_enabled(&self, name: &str) -> Result<bool>;

    /// The configured layer of a named interface.
    fn interface_layer(&self, name: &str) -> Result<InterfaceLayer>;
}

/// Connection settings for one device, passed explicitly into every
/// invocation rather than held in process-global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device hostname or address
    pub host: String,
    /// NX-API port; defaults to 443 (HTTPS) or 80 (HTTP)
    #[serde(default)]
    pub port: Option<u16>,
    /// Whether to use HTTPS
    #[serde(default = "default_true")]
    pub use_ssl: bool,
    /// Whether to validate SSL certificates
    #[serde(default = "default_true")]
    pub validate_certs: bool,
    /// Authentication username
    pub username: String,
    /// Authentication password
    pub password: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl DeviceConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Validation(format!("Cannot read device config '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Validation(format!("Invalid device config '{}': {}", path.display(), e))
        })
    }

    /// Load from `NEXIBLE_HOST`, `NEXIBLE_USERNAME`, `NEXIBLE_PASSWORD` and
    /// optional `NEXIBLE_PORT` / `NEXIBLE_USE_SSL` / `NEXIBLE_VALIDATE_CERTS`
    /// / `NEXIBLE_TIMEOUT_SECS` environment variables.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| -> Result<String> {
            std::env::var(name)
                .map_err(|_| Error::Validation(format!("Missing environment variable {}", name)))
        };
        let flag = |name: &str, default: bool| -> bool {
            std::env::var(name)
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(default)
        };

        Ok(Self {
            host: var("NEXIBLE_HOST")?,
            port: std::env::var("NEXIBLE_PORT").ok().and_then(|v| v.parse().ok()),
            use_ssl: flag("NEXIBLE_USE_SSL", true),
            validate_certs: flag("NEXIBLE_VALIDATE_CERTS", true),
            username: var("NEXIBLE_USERNAME")?,
            password: var("NEXIBLE_PASSWORD")?,
            timeout_secs: std::env::var("NEXIBLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// The effective NX-API port, defaulting by scheme.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.use_ssl {
            NXAPI_DEFAULT_HTTPS_PORT
        } else {
            NXAPI_DEFAULT_HTTP_PORT
        })
    }

    /// The NX-API endpoint URL.
    pub fn endpoint(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}/ins", scheme, self.host, self.effective_port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(use_ssl: bool, port: Option<u16>) -> DeviceConfig {
        DeviceConfig {
            host: "192.0.2.1".to_string(),
            port,
            use_ssl,
            validate_certs: true,
            username: "admin".to_string(),
            password: "secret".to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_effective_port_defaults() {
        assert_eq!(config(true, None).effective_port(), 443);
        assert_eq!(config(false, None).effective_port(), 80);
        assert_eq!(config(true, Some(8443)).effective_port(), 8443);
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(config(true, None).endpoint(), "https://192.0.2.1:443/ins");
        assert_eq!(config(false, Some(8080)).endpoint(), "http://192.0.2.1:8080/ins");
    }

    #[test]
    fn test_config_from_json() {
        let parsed: DeviceConfig = serde_json::from_str(
            r#"{"host": "sw1", "username": "admin", "password": "secret"}"#,
        )
        .unwrap();
        assert_eq!(parsed.host, "sw1");
        assert!(parsed.use_ssl);
        assert!(parsed.validate_certs);
        assert_eq!(parsed.timeout_secs, 30);
    }
}
