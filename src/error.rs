use thiserror::Error;

/// Client-side error taxonomy for the console request pipeline.
///
/// Transport and application failures propagate to the calling feature code,
/// which decides presentation. Authentication failures are handled centrally
/// (refresh coordinator, navigation guard) and are not expected to be caught
/// by feature code.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response reached the server.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// Transport-level failure with an HTTP status the envelope layer could
    /// not recover from.
    #[error("request failed ({status}): {message}")]
    Http { status: u16, message: String },

    /// The response envelope carried a non-200 application status.
    #[error("{message}")]
    Api { status: i64, message: String },

    /// The request required credentials that are not available.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// 403 from the backend, or any state where the session cannot be
    /// recovered by a token refresh.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// The shared refresh cycle this request was queued into failed.
    #[error("token refresh failed")]
    TokenRefreshFailed,

    #[error("route generation failed: {0}")]
    RouteGeneration(String),

    #[error("credential storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether this error terminates the session (forces a redirect to the
    /// login entry point) rather than being retryable by the caller.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClientError::SessionExpired(_) | ClientError::TokenRefreshFailed
        )
    }
}
