use serde::{Deserialize, Serialize};

use crate::error::{HttpError, MiniappError};

/// Business codes carried in the response envelope.
pub struct ResultCode;

impl ResultCode {
    pub const SUCCESS_0: i64 = 0;
    pub const SUCCESS_200: i64 = 200;
    pub const UNAUTHORIZED: i64 = 401;
    pub const TOO_MANY_REQUESTS: i64 = 429;

    /// Both `0` and `200` mean success.
    pub fn is_success(code: i64) -> bool {
        code == Self::SUCCESS_0 || code == Self::SUCCESS_200
    }
}

/// The `{code, message, data}` envelope every endpoint answers with.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        ResultCode::is_success(self.code)
    }

    /// Take the payload, failing if the server omitted it.
    pub fn into_data(self) -> Result<T, MiniappError> {
        self.data.ok_or_else(|| {
            MiniappError::Http(HttpError::Decode(format!(
                "response (code={}) carries no data",
                self.code
            )))
        })
    }
}
