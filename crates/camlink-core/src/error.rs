// ── Core error types ──
//
// Registry-level errors. Precondition failures (unknown id, wrong state,
// missing capability) are raised before any network call. The
// `From<camlink_api::Error>` impl translates wire-level failures into
// domain variants so consumers never match on SOAP faults directly.

use camlink_api::ServiceKind;
use thiserror::Error;

use crate::model::DeviceStatus;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Registry preconditions ───────────────────────────────────────
    #[error("Device not found: {id}")]
    DeviceNotFound { id: String },

    #[error("Device {id} is not connected (status: {status})")]
    DeviceNotConfigured { id: String, status: DeviceStatus },

    #[error("Device {id} does not support the {service} service")]
    Capability { id: String, service: ServiceKind },

    #[error("Device {id} has no media profile {token}")]
    ProfileNotFound { id: String, token: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Cannot connect {service} service at {address}: {reason}")]
    ServiceConnection {
        service: ServiceKind,
        address: String,
        reason: String,
    },

    #[error("{operation} failed on {device_id}: {message}")]
    RemoteOperation {
        device_id: String,
        operation: String,
        message: String,
    },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Discovery ────────────────────────────────────────────────────
    #[error("Discovery failed: {message}")]
    Discovery { message: String },

    // ── Configuration / internal ─────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Translate a session failure, attributing it to `device_id` and
    /// `operation`.
    pub(crate) fn remote(device_id: &str, operation: &str, err: &camlink_api::Error) -> Self {
        let root = err.root();
        if root.is_auth_failure() {
            return Self::AuthenticationFailed {
                message: root.to_string(),
            };
        }
        if root.is_timeout() {
            return Self::Timeout {
                message: format!("{operation} on {device_id}"),
            };
        }
        if let camlink_api::Error::ServiceUnavailable { service } = root {
            return Self::Capability {
                id: device_id.to_owned(),
                service: *service,
            };
        }
        Self::RemoteOperation {
            device_id: device_id.to_owned(),
            operation: operation.to_owned(),
            message: root.to_string(),
        }
    }

    /// `true` for failures caused by the device or network rather than by
    /// the caller's request.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::ServiceConnection { .. }
                | Self::RemoteOperation { .. }
                | Self::AuthenticationFailed { .. }
                | Self::Timeout { .. }
                | Self::Protocol { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<camlink_api::Error> for CoreError {
    fn from(err: camlink_api::Error) -> Self {
        use camlink_api::Error as Api;

        match err {
            Api::DiscoveryTransport { message, source } => CoreError::Discovery {
                message: format!("{message}: {source}"),
            },
            Api::ServiceConnection {
                service,
                address,
                reason,
            } => CoreError::ServiceConnection {
                service,
                address,
                reason,
            },
            Api::ServiceUnavailable { service } => CoreError::Capability {
                id: String::new(),
                service,
            },
            Api::Operation {
                operation,
                device,
                source,
            } => CoreError::remote(&device, operation, &source),
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::Transport(ref e) if e.is_timeout() => CoreError::Timeout {
                message: e.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(message) => CoreError::Config {
                message: format!("TLS error: {message}"),
            },
            other @ (Api::SoapFault { .. }
            | Api::HttpStatus { .. }
            | Api::Transport(_)
            | Api::Xml { .. }
            | Api::MissingField { .. }) => CoreError::Protocol {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_auth_failure_becomes_authentication_error() {
        let api = camlink_api::Error::Operation {
            operation: "GetStreamUri",
            device: "10.0.0.5:80".into(),
            source: Box::new(camlink_api::Error::Authentication {
                message: "bad digest".into(),
            }),
        };
        assert!(matches!(
            CoreError::from(api),
            CoreError::AuthenticationFailed { .. }
        ));
    }

    #[test]
    fn wrapped_fault_keeps_operation_context() {
        let api = camlink_api::Error::Operation {
            operation: "SystemReboot",
            device: "10.0.0.5:80".into(),
            source: Box::new(camlink_api::Error::SoapFault {
                code: "env:Receiver".into(),
                subcode: None,
                reason: "busy".into(),
            }),
        };
        match CoreError::from(api) {
            CoreError::RemoteOperation {
                device_id,
                operation,
                message,
            } => {
                assert_eq!(device_id, "10.0.0.5:80");
                assert_eq!(operation, "SystemReboot");
                assert!(message.contains("busy"));
            }
            other => panic!("expected RemoteOperation, got {other:?}"),
        }
    }
}
