use thiserror::Error;

/// Notice shown when a request never reached the server.
pub const NETWORK_ERROR_NOTICE: &str = "network error, try a different network";
/// Fallback notice for rate-limited requests without a server message.
pub const RATE_LIMITED_NOTICE: &str = "too many requests, please try again later";
/// Fallback notice for failed requests without a server message.
pub const REQUEST_ERROR_NOTICE: &str = "request error";
/// Fallback notice for a rejected login or registration.
pub const LOGIN_FAILED_NOTICE: &str = "login failed, please check your account and password";

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request produced no usable response (connect error, timeout, broken body).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response arrived but could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Mini-program client error types
#[derive(Debug, Error)]
pub enum MiniappError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("too many requests (code={code}): {message}")]
    RateLimited { code: i64, message: String },

    #[error("authentication expired (status={status}): {message}")]
    AuthenticationExpired { status: u16, message: String },

    #[error("business error (status={status}, code={code}): {message}")]
    Business {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("credential refresh failed: {0}")]
    RefreshFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for MiniappError {
    fn from(e: reqwest::Error) -> Self {
        MiniappError::Http(HttpError::Transport(e))
    }
}

impl MiniappError {
    /// True when the request never got a response.
    pub fn is_transport(&self) -> bool {
        matches!(self, MiniappError::Http(HttpError::Transport(_)))
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, MiniappError::AuthenticationExpired { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, MiniappError::RateLimited { .. })
    }

    /// Text for the transient notice shown to the user, if this error gets one.
    ///
    /// Authentication failures return `None`: they are answered with a
    /// re-login prompt or a transparent refresh instead of a toast.
    pub fn user_message(&self) -> Option<String> {
        match self {
            MiniappError::Http(HttpError::Transport(_)) => Some(NETWORK_ERROR_NOTICE.to_string()),
            MiniappError::RateLimited { message, .. } => {
                Some(non_empty_or(message, RATE_LIMITED_NOTICE))
            }
            MiniappError::Business { message, .. } => {
                Some(non_empty_or(message, REQUEST_ERROR_NOTICE))
            }
            MiniappError::Http(HttpError::Decode(_)) | MiniappError::Json(_) => {
                Some(REQUEST_ERROR_NOTICE.to_string())
            }
            MiniappError::AuthenticationExpired { .. }
            | MiniappError::RefreshFailed(_)
            | MiniappError::Config(_)
            | MiniappError::Storage(_) => None,
        }
    }
}

pub(crate) fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}
