//! Error types for eagle-exporter.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias for exporter operations.
pub type ExporterResult<T> = Result<T, ExporterError>;

/// Classification of a failed device poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The device could not be reached.
    NetworkError,
    /// The device answered with a non-success status.
    DeviceRejected,
    /// The device answered, but the payload was unusable.
    MalformedResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NetworkError => "NetworkError",
            Self::DeviceRejected => "DeviceRejected",
            Self::MalformedResponse => "MalformedResponse",
        };
        f.write_str(name)
    }
}

/// Errors produced while fetching a reading from the device.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (unreachable, timeout, connection reset).
    #[error("network error reaching {endpoint}: {reason}")]
    Network {
        /// The URL that was requested.
        endpoint: String,
        /// Description of the transport failure.
        reason: String,
    },

    /// The device responded with a non-success status.
    #[error("device at {endpoint} rejected request with status {status}: {body}")]
    DeviceRejected {
        /// The URL that was requested.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The response was not a usable usage report.
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        /// The URL that was requested.
        endpoint: String,
        /// What was wrong with the payload.
        reason: String,
    },
}

impl FetchError {
    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. } => FailureKind::NetworkError,
            Self::DeviceRejected { .. } => FailureKind::DeviceRejected,
            Self::MalformedResponse { .. } => FailureKind::MalformedResponse,
        }
    }

    /// Returns the endpoint the failed request was sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Network { endpoint, .. }
            | Self::DeviceRejected { endpoint, .. }
            | Self::MalformedResponse { endpoint, .. } => endpoint,
        }
    }

    /// Returns the HTTP status, if the device answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::DeviceRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Process-level errors.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to bind the metrics server.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    /// The metrics server stopped with an error.
    #[error("server error: {0}")]
    Server(String),

    /// The device HTTP client could not be constructed.
    #[error("http client error: {0}")]
    HttpClient(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "http://eagle/cgi-bin/cgi_manager";

    #[test]
    fn test_network_error_display() {
        let err = FetchError::Network {
            endpoint: ENDPOINT.to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "network error reaching http://eagle/cgi-bin/cgi_manager: connection refused"
        );
        assert_eq!(err.kind(), FailureKind::NetworkError);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_device_rejected_display() {
        let err = FetchError::DeviceRejected {
            endpoint: ENDPOINT.to_string(),
            status: 401,
            body: "unauthorized".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status 401"));
        assert!(msg.contains("unauthorized"));
        assert_eq!(err.kind(), FailureKind::DeviceRejected);
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_malformed_response_display() {
        let err = FetchError::MalformedResponse {
            endpoint: ENDPOINT.to_string(),
            reason: "missing field `demand`".to_string(),
        };
        assert!(err.to_string().contains("missing field `demand`"));
        assert_eq!(err.kind(), FailureKind::MalformedResponse);
        assert_eq!(err.endpoint(), ENDPOINT);
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::NetworkError.to_string(), "NetworkError");
        assert_eq!(FailureKind::DeviceRejected.to_string(), "DeviceRejected");
        assert_eq!(FailureKind::MalformedResponse.to_string(), "MalformedResponse");
    }

    #[test]
    fn test_config_error_display() {
        let err = ExporterError::Config("eagle_host cannot be empty".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: eagle_host cannot be empty"
        );
    }

    #[test]
    fn test_bind_failed_display() {
        let addr: SocketAddr = "0.0.0.0:8002".parse().unwrap();
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = ExporterError::BindFailed(addr, io_err);
        assert_eq!(err.to_string(), "failed to bind to 0.0.0.0:8002: address in use");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExporterError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }
}
