//! NX-API transport implementation of [`DeviceClient`].
//!
//! Talks to the switch's `/ins` endpoint over HTTP/HTTPS with basic auth.
//! Reads use the `cli_show` request type (structured JSON bodies) or
//! `cli_show_ascii` for the two precondition probes; config submission uses
//! `cli_conf` with the whole payload in one request so partial application is
//! bounded by the device's own transactional behavior.

use super::{DeviceClient, DeviceConfig, InterfaceLayer};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Matches one row of `show feature` output, e.g. `pim  1  enabled`.
static FEATURE_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(\S+)\s+\d+\s+(enabled|disabled)\s*$").expect("Invalid feature row regex")
});

// ============================================================================
// Request / Response Envelope
// ============================================================================

#[derive(Debug, Serialize)]
struct NxapiRequest {
    ins_api: NxapiInsApi,
}

#[derive(Debug, Serialize)]
struct NxapiInsApi {
    version: String,
    #[serde(rename = "type")]
    req_type: String,
    chunk: String,
    sid: String,
    input: String,
    output_format: String,
}

#[derive(Debug, Deserialize)]
struct NxapiResponse {
    ins_api: NxapiInsApiResponse,
}

#[derive(Debug, Deserialize)]
struct NxapiInsApiResponse {
    outputs: NxapiOutputs,
}

#[derive(Debug, Deserialize)]
struct NxapiOutputs {
    output: NxapiOutputWrapper,
}

/// NX-API returns a single object for one command, an array for several.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NxapiOutputWrapper {
    Single(NxapiOutput),
    Multiple(Vec<NxapiOutput>),
}

#[derive(Debug, Deserialize)]
struct NxapiOutput {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    body: serde_json::Value,
}

// ============================================================================
// Client
// ============================================================================

/// Blocking NX-API client for one device.
pub struct NxapiClient {
    config: DeviceConfig,
    client: Client,
}

impl NxapiClient {
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if config.use_ssl && !config.validate_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Issue one NX-API request and return the per-command outputs, checking
    /// each output's result code.
    fn call(&self, req_type: &str, input: &str) -> Result<Vec<NxapiOutput>> {
        let request = NxapiRequest {
            ins_api: NxapiInsApi {
                version: "1.0".to_string(),
                req_type: req_type.to_string(),
                chunk: "0".to_string(),
                sid: "1".to_string(),
                input: input.to_string(),
                output_format: "json".to_string(),
            },
        };

        debug!(req_type, input, "NX-API request");

        let response = self
            .client
            .post(self.config.endpoint())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Transport(format!(
                "NX-API returned error status {}: {}",
                status, body
            )));
        }

        let api_response: NxapiResponse = response
            .json()
            .map_err(|e| Error::Decode(format!("Invalid NX-API response: {}", e)))?;

        let outputs = match api_response.ins_api.outputs.output {
            NxapiOutputWrapper::Single(out) => vec![out],
            NxapiOutputWrapper::Multiple(outs) => outs,
        };

        for output in &outputs {
            if output.code != "200" {
                return Err(Error::CommandRejected {
                    code: output.code.clone(),
                    message: output.msg.clone(),
                });
            }
        }

        Ok(outputs)
    }

    /// Run an ascii-output show command.
    fn show_ascii(&self, command: &str) -> Result<String> {
        let outputs = self.call("cli_show_ascii", command)?;
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::Decode("Empty NX-API response".to_string()))?;
        match output.body {
            serde_json::Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

impl DeviceClient for NxapiClient {
    fn read_feature_state(&self, command: &str) -> Result<Option<serde_json::Value>> {
        // NX-OS surfaces "not configured" for many feature shows as a command
        // error rather than an empty body; map rejection to absent state.
        match self.call("cli_show", command) {
            Ok(outputs) => {
                let body = outputs.into_iter().next().map(|o| o.body);
                match body {
                    None | Some(serde_json::Value::Null) => Ok(None),
                    Some(serde_json::Value::String(s)) if s.is_empty() => Ok(None),
                    Some(value) => Ok(Some(value)),
                }
            }
            Err(Error::CommandRejected { code, message }) => {
                debug!(command, %code, %message, "show rejected, treating as unconfigured");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn submit(&self, payload: &str) -> Result<()> {
        self.call("cli_conf", payload)?;
        Ok(())
    }

    fn feature_enabled(&self, name: &str) -> Result<bool> {
        let output = self.show_ascii("show feature")?;
        for caps in FEATURE_ROW.captures_iter(&output) {
            if &caps[1] == name {
                return Ok(&caps[2] == "enabled");
            }
        }
        Ok(false)
    }

    fn interface_layer(&self, name: &str) -> Result<InterfaceLayer> {
        let output = self.show_ascii(&format!("show running-config interface {}", name))?;
        for line in output.lines() {
            let trimmed = line.trim();
            if trimmed == "no switchport" {
                return Ok(InterfaceLayer::Layer3);
            }
            if trimmed == "switchport" || trimmed.starts_with("switchport ") {
                return Ok(InterfaceLayer::Layer2);
            }
        }
        // Routed-only interfaces (loopback, mgmt) carry no switchport line.
        Ok(InterfaceLayer::Layer3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_feature_row_regex() {
        let output = "\
Feature Name          Instance  State\n\
--------------------  --------  --------\n\
pim                   1         enabled\n\
bgp                   1         disabled\n";
        let rows: Vec<(String, String)> = FEATURE_ROW
            .captures_iter(output)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("pim".to_string(), "enabled".to_string()),
                ("bgp".to_string(), "disabled".to_string()),
            ]
        );
    }

    #[test]
    fn test_output_wrapper_single_and_multiple() {
        let single: NxapiOutputs = serde_json::from_value(serde_json::json!({
            "output": {"code": "200", "msg": "Success", "body": {}}
        }))
        .unwrap();
        assert!(matches!(single.output, NxapiOutputWrapper::Single(_)));

        let multiple: NxapiOutputs = serde_json::from_value(serde_json::json!({
            "output": [
                {"code": "200", "msg": "Success", "body": {}},
                {"code": "200", "msg": "Success", "body": {}}
            ]
        }))
        .unwrap();
        assert!(matches!(multiple.output, NxapiOutputWrapper::Multiple(v) if v.len() == 2));
    }

    #[test]
    fn test_request_envelope_shape() {
        let request = NxapiRequest {
            ins_api: NxapiInsApi {
                version: "1.0".to_string(),
                req_type: "cli_conf".to_string(),
                chunk: "0".to_string(),
                sid: "1".to_string(),
                input: "interface Ethernet1/33 ; ip pim sparse-mode".to_string(),
                output_format: "json".to_string(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["ins_api"]["type"], "cli_conf");
        assert_eq!(json["ins_api"]["output_format"], "json");
    }
}
