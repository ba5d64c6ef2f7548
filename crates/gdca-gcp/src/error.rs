//! GCP error types following Google Cloud API error conventions.
//!
//! Google Cloud APIs return errors as `{ "error": { "code", "message",
//! "status" } }`. Every failure surfaced by this crate, whether it came from
//! the API, the transport, token exchange or local configuration, is a
//! [`GcpError`]. Callers name the failing call with [`GcpError::with_method`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level error type for all GCP operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcpError {
    /// HTTP status code (0 when the request never reached the server).
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
    /// Canonical status string (e.g. "NOT_FOUND", "PERMISSION_DENIED").
    pub status: String,
    /// The GCP service that returned the error (e.g. "compute", "storage").
    pub service: String,
    /// The call that failed (e.g. "Instances.AggregatedList").
    pub method: Option<String>,
    /// Whether the server considers this retryable (429, 500, 503).
    pub retryable: bool,
}

impl fmt::Display for GcpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref method) = self.method {
            write!(f, "{}: ", method)?;
        }
        write!(
            f,
            "GCP {} error [{}]: {}",
            self.service, self.status, self.message
        )?;
        if self.code != 0 {
            write!(f, " (HTTP {})", self.code)?;
        }
        Ok(())
    }
}

impl std::error::Error for GcpError {}

fn is_retryable(code: u16) -> bool {
    matches!(code, 429 | 500 | 503)
}

impl GcpError {
    /// Create a new GCP error.
    pub fn new(service: &str, code: u16, status: &str, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            status: status.to_string(),
            service: service.to_string(),
            method: None,
            retryable: is_retryable(code),
        }
    }

    /// The request could not be sent or its body could not be read.
    pub fn transport(service: &str, err: impl fmt::Display) -> Self {
        Self::new(service, 0, "UNAVAILABLE", &format!("Request failed: {}", err))
    }

    /// A response arrived but could not be decoded.
    pub fn decode(service: &str, err: impl fmt::Display) -> Self {
        Self::new(service, 0, "INTERNAL", &format!("Response decode error: {}", err))
    }

    /// Authentication / token exchange failure.
    pub fn auth_error(msg: &str) -> Self {
        Self::new("auth", 401, "UNAUTHENTICATED", msg)
    }

    /// Local configuration is missing or invalid.
    pub fn config(msg: &str) -> Self {
        Self::new("config", 0, "INVALID_ARGUMENT", msg)
    }

    /// A caller-imposed deadline elapsed before the call completed.
    pub fn deadline_exceeded(service: &str) -> Self {
        Self::new(service, 0, "DEADLINE_EXCEEDED", "Deadline exceeded")
    }

    /// Parse a GCP API error from a JSON response body.
    pub fn from_api_response(service: &str, status_code: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ApiErrorInner {
            code: Option<u16>,
            message: Option<String>,
            status: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiErrorWrapper {
            error: Option<ApiErrorInner>,
        }

        if let Ok(ApiErrorWrapper { error: Some(err) }) =
            serde_json::from_str::<ApiErrorWrapper>(body)
        {
            let code = err.code.unwrap_or(status_code);
            return Self::new(
                service,
                code,
                err.status.as_deref().unwrap_or_else(|| canonical_status(code)),
                err.message.as_deref().unwrap_or("Unknown error"),
            );
        }

        let message = if body.is_empty() {
            format!("HTTP {}", status_code)
        } else {
            body.chars().take(500).collect()
        };
        Self::new(service, status_code, canonical_status(status_code), &message)
    }

    /// Set the call that failed.
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    /// Whether the resource addressed by the failed call does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code == 404 || self.status == "NOT_FOUND"
    }

    /// Whether the resource addressed by the failed call already exists.
    pub fn is_already_exists(&self) -> bool {
        self.code == 409 || self.status == "ALREADY_EXISTS"
    }
}

/// Map an HTTP status onto the canonical Google status name.
fn canonical_status(code: u16) -> &'static str {
    match code {
        400 => "INVALID_ARGUMENT",
        401 => "UNAUTHENTICATED",
        403 => "PERMISSION_DENIED",
        404 => "NOT_FOUND",
        409 => "ALREADY_EXISTS",
        412 => "FAILED_PRECONDITION",
        429 => "RESOURCE_EXHAUSTED",
        499 => "CANCELLED",
        500 => "INTERNAL",
        501 => "UNIMPLEMENTED",
        503 => "UNAVAILABLE",
        504 => "DEADLINE_EXCEEDED",
        _ => "UNKNOWN",
    }
}

impl From<std::io::Error> for GcpError {
    fn from(e: std::io::Error) -> Self {
        Self::new("io", 0, "INTERNAL", &e.to_string())
    }
}

/// Convenience type alias for GCP results.
pub type GcpResult<T> = Result<T, GcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_google_error_body() {
        let body = r#"{"error":{"code":404,"message":"The specified bucket does not exist.","status":"NOT_FOUND"}}"#;
        let err = GcpError::from_api_response("storage", 404, body);
        assert_eq!(err.code, 404);
        assert_eq!(err.status, "NOT_FOUND");
        assert!(err.is_not_found());
        assert!(!err.retryable);
    }

    #[test]
    fn storage_errors_without_status_get_canonical_name() {
        let body = r#"{"error":{"code":409,"message":"You already own this bucket."}}"#;
        let err = GcpError::from_api_response("storage", 409, body);
        assert_eq!(err.status, "ALREADY_EXISTS");
        assert!(err.is_already_exists());
    }

    #[test]
    fn non_json_body_is_truncated() {
        let body = "x".repeat(2000);
        let err = GcpError::from_api_response("compute", 502, &body);
        assert_eq!(err.message.len(), 500);
        assert_eq!(err.status, "UNKNOWN");
    }

    #[test]
    fn empty_body_uses_http_status() {
        let err = GcpError::from_api_response("pubsub", 503, "");
        assert_eq!(err.message, "HTTP 503");
        assert!(err.retryable);
    }

    #[test]
    fn display_names_failing_call() {
        let err = GcpError::new("compute", 403, "PERMISSION_DENIED", "denied")
            .with_method("Instances.Insert");
        let s = err.to_string();
        assert!(s.starts_with("Instances.Insert: "));
        assert!(s.contains("PERMISSION_DENIED"));
        assert!(s.contains("HTTP 403"));
    }

    #[test]
    fn transport_errors_have_no_http_code() {
        let err = GcpError::transport("logging", "connection refused");
        assert_eq!(err.code, 0);
        assert!(!err.to_string().contains("HTTP"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: GcpError = io.into();
        assert_eq!(err.service, "io");
        assert!(err.message.contains("pipe closed"));
    }
}
