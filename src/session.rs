//! Login session
//!
//! Orchestrates the auth API and the [`CredentialStore`]: logging in stores
//! the grant and caches the user profile, logging out always clears both.
//! The profile is persisted under [`USER_KEY`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::auth::{LoginForm, PhoneLoginForm, ProfileChanges, UserProfile};
use crate::api::{AuthApi, MiniappApi};
use crate::error::MiniappError;
use crate::refresh::RefreshCoordinator;
use crate::storage::Storage;
use crate::token::CredentialStore;
use crate::types::{TokenGrant, TokenMode};

/// Storage key of the cached user profile.
pub const USER_KEY: &str = "user";

pub struct Session {
    auth: AuthApi,
    coordinator: Arc<RefreshCoordinator>,
    store: Arc<CredentialStore>,
    storage: Arc<dyn Storage>,
    profile: Mutex<UserProfile>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("profile", &*self.profile.lock())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session over `store`, starting from the profile cached in `storage`.
    pub fn new(auth: AuthApi, store: Arc<CredentialStore>, storage: Arc<dyn Storage>) -> Self {
        let profile = match storage.get(USER_KEY) {
            Ok(Some(value)) => serde_json::from_value::<UserProfile>(value)
                .map(UserProfile::with_default_avatar)
                .unwrap_or_else(|e| {
                    log::warn!("Ignoring unreadable cached profile: {}", e);
                    UserProfile::default()
                }),
            Ok(None) => UserProfile::default(),
            Err(e) => {
                log::warn!("Failed to read cached profile: {}", e);
                UserProfile::default()
            }
        };

        let coordinator = Arc::clone(auth.context().transport().coordinator());

        Self {
            auth,
            coordinator,
            store,
            storage,
            profile: Mutex::new(profile),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Password login. Stores the grant, then fetches the profile.
    pub async fn login(&self, form: &LoginForm) -> Result<UserProfile, MiniappError> {
        let grant = self.auth.login(form).await?;
        self.establish(grant).await
    }

    /// SMS code login.
    pub async fn login_by_phone(&self, form: &PhoneLoginForm) -> Result<UserProfile, MiniappError> {
        let grant = self.auth.login_by_phone(form).await?;
        self.establish(grant).await
    }

    /// Platform login with the code from the host's login call.
    pub async fn wx_login(&self, code: &str) -> Result<UserProfile, MiniappError> {
        let grant = self.auth.wx_login(code).await?;
        self.establish(grant).await
    }

    /// Register; if the server logs the account in directly, the session is
    /// established as with [`login`](Self::login).
    pub async fn register(&self, form: &LoginForm) -> Result<Option<UserProfile>, MiniappError> {
        match self.auth.register(form).await? {
            Some(grant) => Ok(Some(self.establish(grant).await?)),
            None => Ok(None),
        }
    }

    async fn establish(&self, grant: TokenGrant) -> Result<UserProfile, MiniappError> {
        self.store.write(grant).await?;
        log::info!("[Miniapp] logged in");
        self.fetch_user_info().await
    }

    /// Tell the server, then clear local state whatever it answered.
    pub async fn logout(&self) -> Result<(), MiniappError> {
        if let Err(e) = self.auth.logout().await {
            log::warn!("[Miniapp] logout request failed: {}", e);
        }
        self.clear_local_session().await?;
        log::info!("[Miniapp] logged out");
        Ok(())
    }

    /// Drop credentials and the cached profile without calling the server.
    pub async fn clear_local_session(&self) -> Result<(), MiniappError> {
        self.store.clear().await?;
        *self.profile.lock() = UserProfile::default();
        self.storage.remove(USER_KEY)
    }

    /// Exchange the held refresh token for new credentials.
    ///
    /// Goes through the transport's refresh coordinator: while a refresh is
    /// already running this waits for it instead of issuing a second one.
    ///
    /// # Errors
    /// - `MiniappError::Config` in single-token mode
    /// - `MiniappError::RefreshFailed` without a refresh token, or when the
    ///   server rejects it
    pub async fn refresh_token(&self) -> Result<(), MiniappError> {
        if self.store.mode() == TokenMode::Single {
            return Err(MiniappError::Config(
                "single-token mode has no refresh token".to_string(),
            ));
        }
        if self.store.refresh_token().await.is_none() {
            return Err(MiniappError::RefreshFailed(
                "no refresh token held".to_string(),
            ));
        }

        self.coordinator.refresh_now().await?;
        log::info!("[Miniapp] credentials refreshed");
        Ok(())
    }

    /// A usable access token, refreshing first when the access token has
    /// expired but the refresh token has not. `None` if neither works.
    pub async fn try_get_valid_token(&self) -> Option<String> {
        if let Some(token) = self.store.valid_token().await {
            return Some(token);
        }
        if self.store.mode() == TokenMode::Single || self.store.is_refresh_token_expired().await {
            return None;
        }
        match self.refresh_token().await {
            Ok(()) => self.store.valid_token().await,
            Err(e) => {
                log::warn!("[Miniapp] refresh before use failed: {}", e);
                None
            }
        }
    }

    /// Holds a token that has not expired.
    pub async fn has_login(&self) -> bool {
        self.store.has_valid_login().await
    }

    pub fn user_info(&self) -> UserProfile {
        self.profile.lock().clone()
    }

    /// Reload the profile from the server and cache it.
    pub async fn fetch_user_info(&self) -> Result<UserProfile, MiniappError> {
        let profile = self.auth.user_info().await?;
        self.set_user_info(profile.clone())?;
        Ok(profile)
    }

    /// Replace the cached profile; an empty avatar becomes the default one.
    pub fn set_user_info(&self, profile: UserProfile) -> Result<(), MiniappError> {
        let profile = profile.with_default_avatar();
        self.storage.set(USER_KEY, serde_json::to_value(&profile)?)?;
        *self.profile.lock() = profile;
        Ok(())
    }

    /// Send `{id, ...changes}` and merge the changes locally on success.
    pub async fn update_user_info(&self, changes: &ProfileChanges) -> Result<UserProfile, MiniappError> {
        let id = self.profile.lock().id;
        self.auth.update_info(id, changes).await?;

        let mut profile = self.user_info();
        profile.merge(changes);
        self.set_user_info(profile)?;
        Ok(self.user_info())
    }

    /// Change the cached avatar only.
    pub fn set_user_avatar(&self, avatar: impl Into<String>) -> Result<(), MiniappError> {
        let mut profile = self.user_info();
        profile.avatar = avatar.into();
        self.set_user_info(profile)
    }
}
