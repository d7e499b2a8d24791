//! Error taxonomies for the orchestration layer.
//!
//! `ApiError` covers everything the remote entity client can produce;
//! `StoreError` covers the local keyed store. Controllers catch both
//! locally and turn them into dismissible notices — nothing propagates
//! uncaught in normal operation.

use thiserror::Error;

/// Failures raised by the remote entity client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401. The session has already been cleared as a side effect;
    /// callers must treat this as "session ended, route to login".
    #[error("Unauthorized - please login again")]
    Unauthorized,

    /// Any other non-2xx. `message` comes from the body's `detail` or
    /// `message` field when present, else `HTTP Error: <status>`.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (connect, timeout, DNS).
    #[error("Network error: {0}")]
    Network(String),

    /// A 2xx response whose body did not parse as the expected shape.
    #[error("Response parsing failed: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a reqwest transport error into the taxonomy.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network(format!("request timed out: {err}"))
        } else if err.is_connect() {
            ApiError::Network(format!("cannot reach backend: {err}"))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Failures raised by the local persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The stored envelope carries a schema version this build does not
    /// read. Treated as absent data by loaders, never as corruption.
    #[error("Unsupported store schema version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_message_tells_user_to_login() {
        let msg = ApiError::Unauthorized.to_string();
        assert!(msg.contains("login"));
    }

    #[test]
    fn http_error_displays_extracted_message() {
        let err = ApiError::Http {
            status: 422,
            message: "Patient not found".into(),
        };
        assert_eq!(err.to_string(), "Patient not found");
    }

    #[test]
    fn version_error_names_both_versions() {
        let err = StoreError::Version {
            found: 7,
            expected: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains('7') && msg.contains('1'));
    }
}
