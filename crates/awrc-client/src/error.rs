use awrc_core::{ApiFailure, ErrorCode};
use thiserror::Error;

/// Errors returned by the reporting API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend (or client-side validation) reported a coded failure.
    #[error("reporting API error {0}")]
    Api(#[from] ApiFailure),

    /// A non-2xx status whose body was not a coded failure.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The server answered successfully but with nothing to return.
    #[error("empty response for {context}")]
    EmptyResponse { context: String },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl ClientError {
    /// The coded failure behind this error.
    ///
    /// Transport-level problems get synthetic codes so every screen can
    /// render errors the same way.
    #[must_use]
    pub fn failure(&self) -> ApiFailure {
        let code = match self {
            ClientError::Api(failure) => return failure.clone(),
            ClientError::Http(_) => "network_error",
            ClientError::UnexpectedStatus { .. } => "unexpected_status",
            ClientError::Deserialize { .. } => "bad_response",
            ClientError::EmptyResponse { .. } => "not_found",
            ClientError::InvalidBaseUrl { .. } => "invalid_base_url",
        };
        ApiFailure::new(ErrorCode::Other(code.to_string()), self.to_string())
    }

    /// The error code, when this is a coded failure.
    #[must_use]
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            ClientError::Api(failure) => Some(&failure.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_passes_api_errors_through() {
        let err = ClientError::Api(ApiFailure::no_such_mcc());
        assert_eq!(err.failure(), ApiFailure::no_such_mcc());
        assert_eq!(err.code(), Some(&ErrorCode::NoSuchMcc));
    }

    #[test]
    fn failure_synthesises_codes_for_transport_errors() {
        let err = ClientError::UnexpectedStatus {
            status: 502,
            url: "http://localhost/mcc".to_string(),
        };
        let failure = err.failure();
        assert_eq!(failure.code.as_str(), "unexpected_status");
        assert!(failure.message.contains("502"));
        assert!(err.code().is_none());
    }
}
