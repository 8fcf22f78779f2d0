//! Authentication and account API
//!
//! Login, registration, logout, credential refresh, the user profile and the
//! password-reset flow. Also provides [`AuthRefresher`], the default
//! [`TokenRefresher`] used by the refresh coordinator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::r#trait::{ApiContext, MiniappApi};
use crate::client::{HttpClient, RequestOptions};
use crate::error::MiniappError;
use crate::refresh::{RefreshFuture, TokenRefresher};
use crate::types::{ApiResponse, DualTokenGrant, TokenGrant};

pub const CAPTCHA_PATH: &str = "/miniapp/auth/getCode";
pub const LOGIN_PATH: &str = "/miniapp/auth/login";
pub const PHONE_LOGIN_PATH: &str = "/miniapp/auth/phoneLogin";
pub const WX_LOGIN_PATH: &str = "/auth/wxLogin";
pub const REGISTER_PATH: &str = "/miniapp/auth/register";
pub const LOGOUT_PATH: &str = "/miniapp/auth/logout";
pub const REFRESH_TOKEN_PATH: &str = "/auth/refreshToken";
pub const USER_INFO_PATH: &str = "/miniapp/user/info";
pub const UPDATE_INFO_PATH: &str = "/miniapp/user/updateInfo";
pub const UPDATE_PASSWORD_PATH: &str = "/user/updatePassword";
pub const SEND_RESET_CODE_PATH: &str = "/miniapp/auth/sendResetCode";
pub const VERIFY_RESET_CODE_PATH: &str = "/miniapp/auth/verifyResetCode";
pub const RESET_PASSWORD_PATH: &str = "/miniapp/auth/resetPassword";

/// Avatar used when the server reports none.
pub const DEFAULT_AVATAR: &str = "/static/images/default-avatar.png";

/// Image captcha for the password login form
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Captcha {
    #[serde(default)]
    pub captcha_key: Option<String>,
    /// Image data or URL
    #[serde(default, alias = "captcha_image", alias = "img")]
    pub image: Option<String>,
}

/// Username-or-phone plus password login.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha_key: Option<String>,
}

impl LoginForm {
    pub fn with_username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_phone(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn captcha(mut self, key: impl Into<String>, answer: impl Into<String>) -> Self {
        self.captcha_key = Some(key.into());
        self.captcha = Some(answer.into());
        self
    }
}

/// Phone plus SMS verification code login.
#[derive(Debug, Clone, Serialize)]
pub struct PhoneLoginForm {
    pub phone: String,
    pub code: String,
}

/// Cached user profile
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            id: None,
            username: String::new(),
            nickname: String::new(),
            avatar: DEFAULT_AVATAR.to_string(),
        }
    }
}

impl UserProfile {
    /// Replace an empty avatar with [`DEFAULT_AVATAR`].
    pub fn with_default_avatar(mut self) -> Self {
        if self.avatar.trim().is_empty() {
            self.avatar = DEFAULT_AVATAR.to_string();
        }
        self
    }

    /// Apply the fields present in `changes`.
    pub fn merge(&mut self, changes: &ProfileChanges) {
        if let Some(username) = &changes.username {
            self.username = username.clone();
        }
        if let Some(nickname) = &changes.nickname {
            self.nickname = nickname.clone();
        }
        if let Some(avatar) = &changes.avatar {
            self.avatar = avatar.clone();
        }
    }
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateInfoRequest<'a> {
    id: Option<i64>,
    #[serde(flatten)]
    changes: &'a ProfileChanges,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatePasswordForm {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
struct WxLoginRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshTokenRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct SendResetCodeRequest<'a> {
    phone: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyResetCodeRequest<'a> {
    phone: &'a str,
    code: &'a str,
}

/// Proof of a verified reset code
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResetToken {
    #[serde(rename = "resetToken")]
    pub reset_token: String,
}

#[derive(Debug, Serialize)]
struct ResetPasswordRequest<'a> {
    #[serde(rename = "resetToken")]
    reset_token: &'a str,
    #[serde(rename = "newPassword")]
    new_password: &'a str,
}

/// Authentication API
pub struct AuthApi {
    context: Arc<ApiContext>,
}

impl AuthApi {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    /// GET /miniapp/auth/getCode
    pub async fn captcha(&self) -> Result<Captcha, MiniappError> {
        self.context.fetch(RequestOptions::get(CAPTCHA_PATH)).await
    }

    /// POST /miniapp/auth/login
    pub async fn login(&self, form: &LoginForm) -> Result<TokenGrant, MiniappError> {
        self.context
            .fetch(RequestOptions::post(LOGIN_PATH).json(form)?)
            .await
    }

    /// POST /miniapp/auth/phoneLogin
    pub async fn login_by_phone(&self, form: &PhoneLoginForm) -> Result<TokenGrant, MiniappError> {
        self.context
            .fetch(RequestOptions::post(PHONE_LOGIN_PATH).json(form)?)
            .await
    }

    /// POST /auth/wxLogin with the code from the platform login call
    pub async fn wx_login(&self, code: &str) -> Result<TokenGrant, MiniappError> {
        self.context
            .fetch(RequestOptions::post(WX_LOGIN_PATH).json(&WxLoginRequest { code })?)
            .await
    }

    /// POST /miniapp/auth/register
    ///
    /// Some deployments log the new account in immediately and return a
    /// grant; others return no data.
    pub async fn register(&self, form: &LoginForm) -> Result<Option<TokenGrant>, MiniappError> {
        let response: ApiResponse<TokenGrant> = self
            .context
            .transport
            .send(RequestOptions::post(REGISTER_PATH).json(form)?)
            .await?;
        Ok(response.data)
    }

    /// GET /miniapp/auth/logout
    pub async fn logout(&self) -> Result<(), MiniappError> {
        self.context
            .perform(RequestOptions::get(LOGOUT_PATH).hide_error_toast(true))
            .await
    }

    /// POST /auth/refreshToken
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<DualTokenGrant, MiniappError> {
        self.context
            .fetch(refresh_request(refresh_token)?)
            .await
    }

    /// GET /miniapp/user/info
    pub async fn user_info(&self) -> Result<UserProfile, MiniappError> {
        let profile: UserProfile = self.context.fetch(RequestOptions::get(USER_INFO_PATH)).await?;
        Ok(profile.with_default_avatar())
    }

    /// POST /miniapp/user/updateInfo with `{id, ...changes}`
    pub async fn update_info(
        &self,
        id: Option<i64>,
        changes: &ProfileChanges,
    ) -> Result<(), MiniappError> {
        let body = UpdateInfoRequest { id, changes };
        self.context
            .perform(RequestOptions::post(UPDATE_INFO_PATH).json(&body)?)
            .await
    }

    /// POST /user/updatePassword
    pub async fn update_password(&self, form: &UpdatePasswordForm) -> Result<(), MiniappError> {
        self.context
            .perform(RequestOptions::post(UPDATE_PASSWORD_PATH).json(form)?)
            .await
    }

    /// POST /miniapp/auth/sendResetCode
    pub async fn send_reset_code(&self, phone: &str) -> Result<(), MiniappError> {
        self.context
            .perform(RequestOptions::post(SEND_RESET_CODE_PATH).json(&SendResetCodeRequest { phone })?)
            .await
    }

    /// POST /miniapp/auth/verifyResetCode
    pub async fn verify_reset_code(&self, phone: &str, code: &str) -> Result<ResetToken, MiniappError> {
        let body = VerifyResetCodeRequest { phone, code };
        self.context
            .fetch(RequestOptions::post(VERIFY_RESET_CODE_PATH).json(&body)?)
            .await
    }

    /// POST /miniapp/auth/resetPassword
    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), MiniappError> {
        let body = ResetPasswordRequest {
            reset_token,
            new_password,
        };
        self.context
            .perform(RequestOptions::post(RESET_PASSWORD_PATH).json(&body)?)
            .await
    }
}

impl MiniappApi for AuthApi {
    fn context(&self) -> &ApiContext {
        &self.context
    }

    fn api_name(&self) -> &'static str {
        "auth"
    }
}

fn refresh_request(refresh_token: &str) -> Result<RequestOptions, MiniappError> {
    Ok(RequestOptions::post(REFRESH_TOKEN_PATH)
        .json(&RefreshTokenRequest { refresh_token })?
        .hide_error_toast(true))
}

/// Default refresher: `POST /auth/refreshToken` straight through the
/// executor, bypassing refresh coordination.
#[derive(Debug, Clone)]
pub struct AuthRefresher {
    client: HttpClient,
}

impl AuthRefresher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl TokenRefresher for AuthRefresher {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a> {
        Box::pin(async move {
            let value = self.client.execute(&refresh_request(refresh_token)?).await?;
            let response: ApiResponse<DualTokenGrant> = serde_json::from_value(value)?;
            Ok(TokenGrant::Dual(response.into_data()?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_form_skips_absent_fields() {
        let form = LoginForm::with_username("alice", "pw").captcha("k1", "abcd");
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "username": "alice",
                "password": "pw",
                "captcha": "abcd",
                "captcha_key": "k1"
            })
        );

        let value = serde_json::to_value(LoginForm::with_phone("138", "pw")).unwrap();
        assert!(value.get("username").is_none());
        assert_eq!(value["phone"], "138");
    }

    #[test]
    fn test_user_profile_default_avatar() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id": 7, "username": "alice", "nickname": "A", "avatar": ""}"#)
                .unwrap();
        let profile = profile.with_default_avatar();
        assert_eq!(profile.id, Some(7));
        assert_eq!(profile.avatar, DEFAULT_AVATAR);
        assert_eq!(UserProfile::default().avatar, DEFAULT_AVATAR);
    }

    #[test]
    fn test_profile_merge_and_update_body() {
        let mut profile = UserProfile {
            id: Some(3),
            username: "bob".to_string(),
            nickname: "B".to_string(),
            avatar: "/a.png".to_string(),
        };
        let changes = ProfileChanges {
            nickname: Some("Bobby".to_string()),
            ..Default::default()
        };
        profile.merge(&changes);
        assert_eq!(profile.nickname, "Bobby");
        assert_eq!(profile.avatar, "/a.png");

        let body = serde_json::to_value(UpdateInfoRequest {
            id: profile.id,
            changes: &changes,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"id": 3, "nickname": "Bobby"}));
    }

    #[test]
    fn test_refresh_request_body() {
        let options = refresh_request("r1").unwrap();
        assert_eq!(options.url(), REFRESH_TOKEN_PATH);
        assert!(options.hides_error_toast());
        assert!(options.is_auth_endpoint());
        assert_eq!(
            options.json_body(),
            Some(&serde_json::json!({"refreshToken": "r1"}))
        );
    }

    #[test]
    fn test_reset_token_parse() {
        let token: ResetToken = serde_json::from_str(r#"{"resetToken": "rt"}"#).unwrap();
        assert_eq!(token.reset_token, "rt");
    }
}
