//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use camlink_config::ConfigError;
use camlink_core::{CoreError, DeviceStatus};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const STATE: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the {service} service at {address}")]
    #[diagnostic(
        code(camlink::connection_failed),
        help(
            "Check that the camera is powered and reachable, and that ONVIF is enabled.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed {
        service: String,
        address: String,
        reason: String,
    },

    #[error("Discovery failed: {message}")]
    #[diagnostic(
        code(camlink::discovery),
        help(
            "Another process may hold UDP port 3702.\n\
             Try: camlink discover --bind-port 0"
        )
    )]
    Discovery { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(camlink::auth_failed),
        help(
            "Verify the username and password, and that the camera clock is roughly correct.\n\
             Store a password with: camlink config set-password <camera>"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for camera '{camera}'")]
    #[diagnostic(
        code(camlink::no_credentials),
        help(
            "Pass --username and --password, set CAMLINK_USERNAME / CAMLINK_PASSWORD,\n\
             or add a username to the camera entry and run: camlink config set-password {camera}"
        )
    )]
    NoCredentials { camera: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(camlink::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    #[error("Device {id} is not ready (status: {status})")]
    #[diagnostic(
        code(camlink::not_ready),
        help("Wait for the camera to come back, then retry the command.")
    )]
    NotReady { id: String, status: DeviceStatus },

    #[error("Camera {id} does not offer the {service} service")]
    #[diagnostic(code(camlink::unsupported))]
    Unsupported { id: String, service: String },

    // ── Camera ───────────────────────────────────────────────────────
    #[error("{operation} failed on {device}: {message}")]
    #[diagnostic(code(camlink::remote))]
    Remote {
        device: String,
        operation: String,
        message: String,
    },

    #[error("Unexpected response from camera: {message}")]
    #[diagnostic(code(camlink::protocol))]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(camlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No camera selected")]
    #[diagnostic(
        code(camlink::no_camera),
        help(
            "Pass --address <ip[:port]> or --camera <name>, or set default_camera in\n\
             {path}"
        )
    )]
    NoCamera { path: String },

    #[error("Camera '{name}' not found in configuration")]
    #[diagnostic(
        code(camlink::camera_not_found),
        help("Configured cameras: {available}")
    )]
    CameraNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(camlink::config))]
    Config { message: String },

    #[error("Keyring error: {0}")]
    #[diagnostic(code(camlink::keyring))]
    Keyring(String),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(camlink::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Operation '{action}' cancelled")]
    #[diagnostic(code(camlink::cancelled))]
    Cancelled { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out: {message}")]
    #[diagnostic(
        code(camlink::timeout),
        help("Increase the timeout with --timeout or check the camera's responsiveness.")
    )]
    Timeout { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(camlink::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Discovery { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::Keyring(_) => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::CameraNotFound { .. } => exit_code::NOT_FOUND,
            Self::NotReady { .. } => exit_code::STATE,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoCamera { .. }
            | Self::Config { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNotFound { id } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: id,
                hint: "Run: camlink discover to see cameras on the network".into(),
            },

            CoreError::DeviceNotConfigured { id, status } => CliError::NotReady { id, status },

            CoreError::Capability { id, service } => CliError::Unsupported {
                id,
                service: service.to_string(),
            },

            CoreError::ProfileNotFound { id, token } => CliError::NotFound {
                resource_type: "media profile".into(),
                identifier: token,
                hint: format!("Run: camlink devices probe to list the profiles of {id}"),
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::ServiceConnection {
                service,
                address,
                reason,
            } => CliError::ConnectionFailed {
                service: service.to_string(),
                address,
                reason,
            },

            CoreError::RemoteOperation {
                device_id,
                operation,
                message,
            } => CliError::Remote {
                device: device_id,
                operation,
                message,
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { message } => CliError::Timeout { message },

            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::Discovery { message } => CliError::Discovery { message },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownCamera { name } => CliError::CameraNotFound {
                name,
                available: String::new(),
            },
            ConfigError::NoCredentials { camera } => CliError::NoCredentials { camera },
            ConfigError::Keyring(message) => CliError::Keyring(message),
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use camlink_core::ServiceKind;

    use super::*;

    #[test]
    fn precondition_failures_get_distinct_exit_codes() {
        let not_found = CliError::from(CoreError::DeviceNotFound { id: "x".into() });
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let rebooting = CliError::from(CoreError::DeviceNotConfigured {
            id: "x".into(),
            status: DeviceStatus::Rebooting,
        });
        assert_eq!(rebooting.exit_code(), exit_code::STATE);

        let no_ptz = CliError::from(CoreError::Capability {
            id: "x".into(),
            service: ServiceKind::Ptz,
        });
        assert_eq!(no_ptz.exit_code(), exit_code::UNSUPPORTED);
    }

    #[test]
    fn camera_failures_map_to_connection_auth_and_timeout() {
        let auth = CliError::from(CoreError::AuthenticationFailed {
            message: "NotAuthorized".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let timeout = CliError::from(CoreError::Timeout {
            message: "GetStreamUri".into(),
        });
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let conn = CliError::from(CoreError::ServiceConnection {
            service: ServiceKind::Media,
            address: "http://10.0.0.5/onvif/media".into(),
            reason: "refused".into(),
        });
        assert_eq!(conn.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn missing_credentials_is_an_auth_failure() {
        let err = CliError::from(ConfigError::NoCredentials {
            camera: "lobby".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert!(err.to_string().contains("lobby"));
    }
}
