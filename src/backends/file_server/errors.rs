use thiserror::Error;

/// Typed error enum for file server requests
///
/// `Fetch` and `Status` are transport-level failures; `Decode` means the
/// server answered but not with the expected shape. All of them end the
/// current query cycle, nothing is retried automatically.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// Network/connection errors (timeout, connection refused, etc.)
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The server replied with a non-success status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response received but not in the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A request URL could not be built from the configured base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else if error.is_timeout() {
            ApiError::Fetch(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            ApiError::Fetch(format!("Connection failed: {}", error))
        } else {
            ApiError::Fetch(error.to_string())
        }
    }

    /// Create an error from an HTTP status code and response body
    pub fn from_status(status: u16, body: String) -> Self {
        ApiError::Status { status, body }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode(_))
    }

    /// Transport-level failures, everything except a shape mismatch
    pub fn is_fetch(&self) -> bool {
        !self.is_decode()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Decode(error.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(error: url::ParseError) -> Self {
        ApiError::InvalidUrl(error.to_string())
    }
}
