use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PermissionDenied,
    InvalidArgument,
    Unauthenticated,
    QuotaExceeded,
    NotFound,
    DeadlineExceeded,
    Unavailable,
    /// The request never produced a provider answer (connect, TLS, decode).
    Transport,
    Unknown,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Transport => "TRANSPORT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Map a provider status string (`PERMISSION_DENIED`, ...) to a code.
    pub fn from_status(status: &str) -> Option<Self> {
        let code = match status.trim().to_ascii_uppercase().as_str() {
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "INVALID_ARGUMENT" | "FAILED_PRECONDITION" => Self::InvalidArgument,
            "UNAUTHENTICATED" => Self::Unauthenticated,
            "RESOURCE_EXHAUSTED" | "QUOTA_EXCEEDED" => Self::QuotaExceeded,
            "NOT_FOUND" => Self::NotFound,
            "DEADLINE_EXCEEDED" => Self::DeadlineExceeded,
            "UNAVAILABLE" => Self::Unavailable,
            _ => return None,
        };
        Some(code)
    }

    /// Map an HTTP status returned by the provider to a code.
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidArgument,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 | 504 => Self::DeadlineExceeded,
            429 => Self::QuotaExceeded,
            502 | 503 => Self::Unavailable,
            _ => Self::Unknown,
        }
    }

    /// Last-resort classification by scanning an error message for a known
    /// status name.
    pub fn from_message(message: &str) -> Self {
        const NEEDLES: [(&str, ErrorCode); 8] = [
            ("PERMISSION_DENIED", ErrorCode::PermissionDenied),
            ("INVALID_ARGUMENT", ErrorCode::InvalidArgument),
            ("UNAUTHENTICATED", ErrorCode::Unauthenticated),
            ("RESOURCE_EXHAUSTED", ErrorCode::QuotaExceeded),
            ("QUOTA", ErrorCode::QuotaExceeded),
            ("NOT_FOUND", ErrorCode::NotFound),
            ("DEADLINE_EXCEEDED", ErrorCode::DeadlineExceeded),
            ("UNAVAILABLE", ErrorCode::Unavailable),
        ];
        let upper = message.to_ascii_uppercase();
        NEEDLES
            .iter()
            .find(|(needle, _)| upper.contains(needle))
            .map_or(Self::Unknown, |(_, code)| *code)
    }

    /// Operator-facing remediation hint, logged when the startup connectivity check fails.
    pub const fn hint(self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "grant the service account viewer access on the provider property"
            }
            Self::InvalidArgument => "check the property id format (numeric)",
            Self::Unauthenticated => "check the service account credential values",
            Self::QuotaExceeded => "provider quota exhausted; wait or raise the quota",
            Self::NotFound => "the property id does not exist or the endpoint is wrong",
            Self::DeadlineExceeded => "provider did not answer in time; check connectivity",
            Self::Unavailable => "provider is temporarily unavailable",
            Self::Transport => "could not reach the provider endpoint",
            Self::Unknown => "inspect the error message for details",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Error raised by a provider client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: ErrorCode,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Build an error whose code is inferred from its message.
    pub fn classified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: ErrorCode::from_message(&message),
            message,
        }
    }
}

/// A classified failure remembered for the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub message: String,
    pub code: ErrorCode,
    pub at: DateTime<Utc>,
}

impl From<&ProviderError> for FailureRecord {
    fn from(err: &ProviderError) -> Self {
        Self {
            message: err.message.clone(),
            code: err.code,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(
            ErrorCode::from_status("PERMISSION_DENIED"),
            Some(ErrorCode::PermissionDenied)
        );
        assert_eq!(
            ErrorCode::from_status("resource_exhausted"),
            Some(ErrorCode::QuotaExceeded)
        );
        assert_eq!(ErrorCode::from_status("SOMETHING_ELSE"), None);
    }

    #[test]
    fn test_from_http_status() {
        assert_eq!(ErrorCode::from_http_status(403), ErrorCode::PermissionDenied);
        assert_eq!(ErrorCode::from_http_status(401), ErrorCode::Unauthenticated);
        assert_eq!(ErrorCode::from_http_status(429), ErrorCode::QuotaExceeded);
        assert_eq!(ErrorCode::from_http_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_http_status(500), ErrorCode::Unknown);
    }

    #[test]
    fn test_from_message() {
        assert_eq!(
            ErrorCode::from_message("7 PERMISSION_DENIED: User does not have access"),
            ErrorCode::PermissionDenied
        );
        assert_eq!(
            ErrorCode::from_message("Exhausted property tokens quota"),
            ErrorCode::QuotaExceeded
        );
        assert_eq!(ErrorCode::from_message("socket hang up"), ErrorCode::Unknown);
    }

    #[test]
    fn test_error_display_includes_code() {
        let err = ProviderError::new(ErrorCode::NotFound, "property 1 missing");
        assert_eq!(err.to_string(), "NOT_FOUND: property 1 missing");
    }

    #[test]
    fn test_failure_record_serializes_code_string() {
        let err = ProviderError::classified("PERMISSION_DENIED: nope");
        let record = FailureRecord::from(&err);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["code"], "PERMISSION_DENIED");
        assert_eq!(json["message"], "PERMISSION_DENIED: nope");
    }
}
