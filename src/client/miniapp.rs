//! Unified mini-program client

use std::sync::Arc;

use crate::api::auth::{LoginForm, UserProfile};
use crate::api::{
    ApiContext, ArticleApi, AuthApi, CartApi, CatalogApi, CommentApi, FavoriteApi,
};
use crate::error::MiniappError;
use crate::session::Session;
use crate::token::CredentialStore;

use super::{MiniappBuilder, Transport};

/// Unified mini-program client
///
/// The entry point of the crate. Owns the shared transport, the refresh
/// coordinator behind it, and the login session. Cloning is cheap and every
/// clone shares the same credentials and refresh episode.
///
/// # Example
///
/// ```rust,ignore
/// use miniapp_client::Miniapp;
/// use miniapp_client::api::auth::LoginForm;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let app = Miniapp::builder()
///         .base_url("https://shop.example.com")
///         .build()?;
///
///     let profile = app.login(&LoginForm::with_username("alice", "secret")).await?;
///     println!("Hello {}", profile.nickname);
///
///     let cart = app.cart().list().await?;
///     println!("{} items in cart", cart.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Miniapp {
    context: Arc<ApiContext>,
    session: Arc<Session>,
}

impl std::fmt::Debug for Miniapp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Miniapp")
            .field("transport", self.transport())
            .field("session", &self.session)
            .finish()
    }
}

impl Miniapp {
    pub fn builder() -> MiniappBuilder {
        MiniappBuilder::default()
    }

    pub(crate) fn new(context: Arc<ApiContext>, session: Arc<Session>) -> Self {
        Self { context, session }
    }

    pub fn transport(&self) -> &Transport {
        self.context.transport()
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        self.session.credentials()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(Arc::clone(&self.context))
    }

    pub fn cart(&self) -> CartApi {
        CartApi::new(Arc::clone(&self.context))
    }

    pub fn catalog(&self) -> CatalogApi {
        CatalogApi::new(Arc::clone(&self.context))
    }

    pub fn favorites(&self) -> FavoriteApi {
        FavoriteApi::new(Arc::clone(&self.context))
    }

    pub fn comments(&self) -> CommentApi {
        CommentApi::new(Arc::clone(&self.context))
    }

    pub fn articles(&self) -> ArticleApi {
        ArticleApi::new(Arc::clone(&self.context))
    }

    // ============================================================================
    // Session shortcuts
    // ============================================================================

    /// Password login; see [`Session::login`].
    pub async fn login(&self, form: &LoginForm) -> Result<UserProfile, MiniappError> {
        self.session.login(form).await
    }

    /// Platform login; see [`Session::wx_login`].
    pub async fn wx_login(&self, code: &str) -> Result<UserProfile, MiniappError> {
        self.session.wx_login(code).await
    }

    pub async fn logout(&self) -> Result<(), MiniappError> {
        self.session.logout().await
    }

    pub async fn has_login(&self) -> bool {
        self.session.has_login().await
    }

    pub fn user_info(&self) -> UserProfile {
        self.session.user_info()
    }
}
