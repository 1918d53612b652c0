//! Error types for Nexible.
//!
//! Every failure aborts the current reconciliation pass; there is no
//! partial-success state. The variants mirror where in the pass the failure
//! occurred: before any device I/O (validation), after read-only device calls
//! (precondition), or at submission time (rejection vs. transport).

use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Nexible.
#[derive(Error, Debug)]
pub enum Error {
    /// Mutually exclusive or missing-dependency parameters. Detected before
    /// any device I/O; no commands are computed.
    #[error("Invalid parameters: {0}")]
    Validation(String),

    /// A required feature is not enabled on the device, or the target
    /// interface is the wrong layer for the feature. Detected after a
    /// read-only device call, before planning.
    #[error("Precondition not met: {0}")]
    Precondition(String),

    /// The device refused a submitted command. Surfaced verbatim; the driver
    /// does not retry and does not attempt partial rollback.
    #[error("Device rejected command (code {code}): {message}")]
    CommandRejected {
        /// NX-API per-command result code
        code: String,
        /// Device-reported message
        message: String,
    },

    /// Network or transport failure talking to the device. Propagated
    /// unchanged; retries, if desired, belong to the transport.
    #[error("Device communication failed: {0}")]
    Transport(String),

    /// The device answered but the response could not be decoded.
    #[error("Failed to decode device response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl Error {
    /// True for failures raised before anything was sent to the device.
    pub fn is_pre_device(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Precondition(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Validation("access and group are mutually exclusive".to_string());
        assert!(err.to_string().contains("mutually exclusive"));

        let err = Error::CommandRejected {
            code: "400".to_string(),
            message: "Invalid command".to_string(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Invalid command"));
    }

    #[test]
    fn test_is_pre_device() {
        assert!(Error::Validation("x".to_string()).is_pre_device());
        assert!(Error::Precondition("x".to_string()).is_pre_device());
        assert!(!Error::Transport("x".to_string()).is_pre_device());
    }
}
