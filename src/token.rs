//! Credential store
//!
//! Holds the current [`CredentialState`], derives absolute expiry when a
//! grant is stored, and mirrors everything into [`Storage`] so the login
//! survives a restart. It never talks to the network; refreshing is the
//! coordinator's job.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::MiniappError;
use crate::storage::Storage;
use crate::types::{now_millis, CredentialState, TokenGrant, TokenMode};

/// Storage key of the serialized credential state.
pub const TOKEN_KEY: &str = "token";
/// Storage key of the access token's absolute expiry (epoch ms).
pub const ACCESS_EXPIRE_KEY: &str = "accessTokenExpireTime";
/// Storage key of the refresh token's absolute expiry (epoch ms).
pub const REFRESH_EXPIRE_KEY: &str = "refreshTokenExpireTime";

pub struct CredentialStore {
    mode: TokenMode,
    state: RwLock<CredentialState>,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// An empty store; nothing is read from `storage`.
    pub fn new(mode: TokenMode, storage: Arc<dyn Storage>) -> Self {
        Self {
            mode,
            state: RwLock::new(CredentialState::empty(mode)),
            storage,
        }
    }

    /// Rebuild the store from whatever `storage` persisted last time.
    ///
    /// A persisted state of the other mode (the deployment was switched) is
    /// ignored and the store starts logged out.
    pub fn load(mode: TokenMode, storage: Arc<dyn Storage>) -> Result<Self, MiniappError> {
        let state = match storage.get(TOKEN_KEY)? {
            Some(value) => match serde_json::from_value::<CredentialState>(value) {
                Ok(state) if state.mode() == mode => state,
                Ok(state) => {
                    log::warn!(
                        "Ignoring persisted {:?} credentials in {:?} mode",
                        state.mode(),
                        mode
                    );
                    CredentialState::empty(mode)
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable persisted credentials: {}", e);
                    CredentialState::empty(mode)
                }
            },
            None => CredentialState::empty(mode),
        };

        Ok(Self {
            mode,
            state: RwLock::new(state),
            storage,
        })
    }

    pub fn mode(&self) -> TokenMode {
        self.mode
    }

    pub async fn read(&self) -> CredentialState {
        self.state.read().await.clone()
    }

    /// Store a freshly issued grant, pinning its expiry to now.
    pub async fn write(&self, grant: TokenGrant) -> Result<CredentialState, MiniappError> {
        let state = grant.into_state(now_millis());
        self.restore(state.clone()).await?;
        Ok(state)
    }

    /// Install an already-absolute state.
    pub async fn restore(&self, state: CredentialState) -> Result<(), MiniappError> {
        state.ensure_mode(self.mode)?;

        let mut current = self.state.write().await;
        self.persist(&state)?;
        *current = state;
        Ok(())
    }

    /// Forget all credential material. Safe to call repeatedly.
    pub async fn clear(&self) -> Result<(), MiniappError> {
        let mut current = self.state.write().await;
        *current = CredentialState::empty(self.mode);
        self.storage.remove(ACCESS_EXPIRE_KEY)?;
        self.storage.remove(REFRESH_EXPIRE_KEY)?;
        self.storage.remove(TOKEN_KEY)?;
        log::debug!("Credentials cleared");
        Ok(())
    }

    fn persist(&self, state: &CredentialState) -> Result<(), MiniappError> {
        self.storage
            .set(TOKEN_KEY, serde_json::to_value(state)?)?;
        self.storage
            .set(ACCESS_EXPIRE_KEY, state.access_expires_at().into())?;
        match state.refresh_expires_at() {
            Some(at) => self.storage.set(REFRESH_EXPIRE_KEY, at.into()),
            None => self.storage.remove(REFRESH_EXPIRE_KEY),
        }
    }

    /// A token is present, expired or not.
    pub async fn has_login_info(&self) -> bool {
        self.state.read().await.has_token()
    }

    pub async fn is_token_expired(&self) -> bool {
        is_past(self.state.read().await.access_expires_at(), now_millis())
    }

    /// Always `true` in single mode, which has nothing to refresh with.
    pub async fn is_refresh_token_expired(&self) -> bool {
        match self.state.read().await.refresh_expires_at() {
            Some(at) => is_past(at, now_millis()),
            None => true,
        }
    }

    /// A token is present and not yet expired.
    pub async fn has_valid_login(&self) -> bool {
        self.valid_token().await.is_some()
    }

    pub async fn valid_token(&self) -> Option<String> {
        let state = self.state.read().await;
        if !state.has_token() || is_past(state.access_expires_at(), now_millis()) {
            return None;
        }
        Some(state.bearer_token().to_string())
    }

    /// The token to stamp on outgoing requests, regardless of expiry.
    pub async fn bearer_token(&self) -> Option<String> {
        let state = self.state.read().await;
        state
            .has_token()
            .then(|| state.bearer_token().to_string())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .refresh_token()
            .map(str::to_string)
    }
}

/// An unknown (`0`) expiry counts as expired.
fn is_past(expires_at: i64, now_ms: i64) -> bool {
    expires_at == 0 || now_ms >= expires_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::{DualCredential, DualTokenGrant, SingleCredential, SingleTokenGrant};

    fn dual_grant(access_secs: i64, refresh_secs: i64) -> TokenGrant {
        TokenGrant::Dual(DualTokenGrant {
            access_token: "access_1".to_string(),
            access_expires_in: access_secs,
            refresh_token: "refresh_1".to_string(),
            refresh_expires_in: refresh_secs,
        })
    }

    #[test]
    fn test_is_past() {
        assert!(is_past(0, 10));
        assert!(is_past(10, 10));
        assert!(!is_past(11, 10));
    }

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = CredentialStore::new(TokenMode::Dual, Arc::new(MemoryStorage::new()));
        assert_eq!(store.read().await, CredentialState::empty(TokenMode::Dual));
        assert!(!store.has_login_info().await);
        assert!(store.is_token_expired().await);
        assert!(store.is_refresh_token_expired().await);
        assert!(store.bearer_token().await.is_none());
    }

    #[tokio::test]
    async fn test_write_persists_expiry_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(TokenMode::Dual, storage.clone());

        let before = now_millis();
        let state = store.write(dual_grant(7200, 86400)).await.unwrap();

        let access_at = storage.get(ACCESS_EXPIRE_KEY).unwrap().unwrap();
        let refresh_at = storage.get(REFRESH_EXPIRE_KEY).unwrap().unwrap();
        assert_eq!(access_at.as_i64(), Some(state.access_expires_at()));
        assert!(access_at.as_i64().unwrap() >= before + 7_200_000);
        assert!(refresh_at.as_i64().unwrap() >= before + 86_400_000);
        assert!(storage.get(TOKEN_KEY).unwrap().is_some());

        assert!(store.has_valid_login().await);
        assert_eq!(store.valid_token().await.as_deref(), Some("access_1"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("refresh_1"));
        assert!(!store.is_refresh_token_expired().await);
    }

    #[tokio::test]
    async fn test_write_rejects_other_shape() {
        let store = CredentialStore::new(TokenMode::Single, Arc::new(MemoryStorage::new()));
        let result = store.write(dual_grant(10, 10)).await;
        assert!(matches!(result, Err(MiniappError::Config(_))));
        assert!(!store.has_login_info().await);
    }

    #[tokio::test]
    async fn test_expired_token_still_bears() {
        let store = CredentialStore::new(TokenMode::Single, Arc::new(MemoryStorage::new()));
        store
            .restore(CredentialState::Single(SingleCredential {
                token: "stale".to_string(),
                expires_at: now_millis() - 1_000,
            }))
            .await
            .unwrap();

        assert!(store.has_login_info().await);
        assert!(store.is_token_expired().await);
        assert!(!store.has_valid_login().await);
        assert!(store.valid_token().await.is_none());
        assert_eq!(store.bearer_token().await.as_deref(), Some("stale"));
        assert!(store.is_refresh_token_expired().await);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(TokenMode::Dual, storage.clone());
        store.write(dual_grant(60, 60)).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.read().await, CredentialState::empty(TokenMode::Dual));
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
        assert!(storage.get(ACCESS_EXPIRE_KEY).unwrap().is_none());
        assert!(storage.get(REFRESH_EXPIRE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_restores_persisted_state() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let first = CredentialStore::new(TokenMode::Dual, storage.clone());
        first.write(dual_grant(600, 6000)).await.unwrap();

        let second = CredentialStore::load(TokenMode::Dual, storage).unwrap();
        assert_eq!(second.read().await, first.read().await);
    }

    #[tokio::test]
    async fn test_load_ignores_other_mode() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let dual = CredentialStore::new(TokenMode::Dual, storage.clone());
        dual.restore(CredentialState::Dual(DualCredential {
            access_token: "a".to_string(),
            access_expires_at: now_millis() + 60_000,
            refresh_token: "r".to_string(),
            refresh_expires_at: now_millis() + 600_000,
        }))
        .await
        .unwrap();

        let single = CredentialStore::load(TokenMode::Single, storage).unwrap();
        assert_eq!(single.read().await, CredentialState::empty(TokenMode::Single));
    }

    #[tokio::test]
    async fn test_single_write_drops_refresh_key() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(REFRESH_EXPIRE_KEY, 99.into()).unwrap();
        let store = CredentialStore::new(TokenMode::Single, storage.clone());

        store
            .write(TokenGrant::Single(SingleTokenGrant {
                token: "t".to_string(),
                expires_in: 60,
            }))
            .await
            .unwrap();

        assert!(storage.get(REFRESH_EXPIRE_KEY).unwrap().is_none());
        assert!(store.refresh_token().await.is_none());
    }
}
