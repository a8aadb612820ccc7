use thiserror::Error;

use crate::types::ServiceKind;

/// Top-level error type for the `camlink-api` crate.
///
/// Covers every failure mode across both wire surfaces:
/// WS-Discovery over UDP, and ONVIF SOAP sessions over HTTP.
/// `camlink-core` maps these into registry-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Discovery ───────────────────────────────────────────────────
    /// Socket bind, multicast join, or probe send failed.
    #[error("Discovery transport error: {message}")]
    DiscoveryTransport {
        message: String,
        #[source]
        source: std::io::Error,
    },

    // ── Session ─────────────────────────────────────────────────────
    /// A service endpoint could not be bound during session initialization.
    #[error("Cannot connect {service} service at {address}: {reason}")]
    ServiceConnection {
        service: ServiceKind,
        address: String,
        reason: String,
    },

    /// The operation needs a service the session never connected.
    /// Raised before any network call.
    #[error("{service} service not available")]
    ServiceUnavailable { service: ServiceKind },

    /// A connected service rejected or failed a specific remote call.
    #[error("{operation} failed on {device}: {source}")]
    Operation {
        operation: &'static str,
        device: String,
        #[source]
        source: Box<Error>,
    },

    // ── Authentication ──────────────────────────────────────────────
    /// The device rejected the UsernameToken (HTTP 401 or `NotAuthorized` fault).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── SOAP ────────────────────────────────────────────────────────
    /// Structured SOAP 1.2 fault returned by the device.
    #[error("SOAP fault ({code}): {reason}")]
    SoapFault {
        code: String,
        subcode: Option<String>,
        reason: String,
    },

    /// Non-success HTTP status without a parseable SOAP fault.
    #[error("Unexpected HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Response body was not well-formed XML, with the raw body for debugging.
    #[error("Malformed XML: {message}")]
    Xml { message: String, body: String },

    /// A well-formed response lacked a required element.
    #[error("Response missing <{element}>")]
    MissingField { element: &'static str },
}

impl Error {
    /// Wrap a remote failure with the operation name and device address.
    pub(crate) fn operation(operation: &'static str, device: &str, source: Error) -> Self {
        Self::Operation {
            operation,
            device: device.to_owned(),
            source: Box::new(source),
        }
    }

    /// Strip `Operation` wrappers and return the underlying cause.
    pub fn root(&self) -> &Error {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns `true` if the device rejected our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.root(), Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self.root() {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { status, .. } => *status >= 500,
            Self::DiscoveryTransport { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the request timed out at the transport level.
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Self::Transport(e) if e.is_timeout())
    }

    /// The SOAP fault subcode (e.g. `ter:ActionNotSupported`), if any.
    pub fn fault_subcode(&self) -> Option<&str> {
        match self.root() {
            Self::SoapFault { subcode, .. } => subcode.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_wrapper_exposes_root_cause() {
        let err = Error::operation(
            "GetStreamUri",
            "192.168.1.50:80",
            Error::Authentication {
                message: "bad digest".into(),
            },
        );
        assert!(err.is_auth_failure());
        assert!(err.to_string().starts_with("GetStreamUri failed on 192.168.1.50:80"));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::HttpStatus {
            status: 503,
            url: "http://cam/onvif/device_service".into(),
        };
        assert!(err.is_transient());
        assert!(
            !Error::ServiceUnavailable {
                service: ServiceKind::Ptz
            }
            .is_transient()
        );
    }
}
