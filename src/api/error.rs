use reqwest::StatusCode;

/// The outcome of a single request, as seen by interceptors and callers.
pub type Outcome = Result<reqwest::Response, ApiError>;

/// Possible failures while issuing a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server responded, but not successfully.
    /// `body` holds the response payload as the server sent it.
    #[error("server responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    /// We never received a response (connectivity, DNS, timeouts).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The request path could not be resolved against our origin.
    #[error("invalid request path: {0}")]
    InvalidPath(#[from] url::ParseError),
    /// The request path pointed outside of our origin.
    #[error("request path {0:?} leaves the configured origin")]
    ForeignOrigin(String),
    /// A successful response body was not the JSON we expected.
    #[error("unable to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// The server-reported status code, if the server responded at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
