use thiserror::Error;

/// Failure of a single backend call.
///
/// Every variant names the operation that failed (e.g. `"get bucket 3"`) so
/// callers can log or display it without extra context.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("{operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-2xx status.
    #[error("{operation} failed with HTTP {status}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("{operation} returned an unreadable body: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(operation: impl Into<String>, status: u16) -> Self {
        ApiError::Status {
            operation: operation.into(),
            status,
            body: String::new(),
        }
    }

    pub fn operation(&self) -> &str {
        match self {
            ApiError::Transport { operation, .. }
            | ApiError::Status { operation, .. }
            | ApiError::Decode { operation, .. } => operation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Why a form submission did not reach the backend, or failed there.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Edit form whose entity has not been loaded.
    #[error("form is not ready for submission")]
    NotReady,

    /// The view was torn down while the request was in flight.
    #[error("form was closed before the request completed")]
    Closed,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_reports_operation_and_code() {
        let err = ApiError::status("get bucket 9", 404);
        assert_eq!(err.to_string(), "get bucket 9 failed with HTTP 404");
        assert!(err.is_not_found());
        assert_eq!(err.operation(), "get bucket 9");
        assert!(!ApiError::status("list buckets", 500).is_not_found());
    }

    #[test]
    fn missing_fields_lists_every_field() {
        let err = FormError::MissingFields(vec!["title", "version"]);
        assert_eq!(err.to_string(), "missing required fields: title, version");
    }
}
