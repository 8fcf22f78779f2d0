//! Refresh coordination
//!
//! At most one credential refresh runs per [`RefreshCoordinator`]. Requests
//! that hit a 401 while dual-token credentials are held park a
//! [`ReplayTask`] in the coordinator's queue; when the refresh settles the
//! queue is drained. On success every task is invoked in enqueue order, on
//! failure the tasks are dropped without being invoked.
//!
//! The flag and the queue sit behind one `parking_lot` mutex that is never
//! held across an await, so "enqueue, then start a refresh only if none is
//! running" is a single critical section. The episode itself runs on its own
//! task: once started it settles even if every waiting request is dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::MiniappError;
use crate::interaction::{Interaction, ReauthReason};
use crate::token::CredentialStore;
use crate::types::TokenGrant;

/// Notice shown after a successful refresh.
pub const TOKEN_REFRESHED_NOTICE: &str = "token refreshed";

/// Re-issues one parked request.
pub type ReplayTask = Box<dyn FnOnce() + Send>;

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TokenGrant, MiniappError>> + Send + 'a>>;

/// Exchanges a refresh token for a fresh grant.
pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a>;
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    queue: Vec<ReplayTask>,
}

pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    interaction: Arc<dyn Interaction>,
    login_page: String,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &state.refreshing)
            .field("pending", &state.queue.len())
            .field("login_page", &self.login_page)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        interaction: Arc<dyn Interaction>,
        login_page: impl Into<String>,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            store,
            refresher,
            interaction,
            login_page: login_page.into(),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of parked replay tasks.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn login_page(&self) -> &str {
        &self.login_page
    }

    /// Park `task`; if no refresh is running, start one on a detached task.
    ///
    /// Returns `true` when this call started the episode.
    pub(crate) fn enqueue_or_refresh(self: &Arc<Self>, task: ReplayTask) -> bool {
        let started = self.enqueue(task);
        if started {
            let coordinator = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = coordinator.run_refresh().await {
                    log::debug!("[Miniapp] refresh episode ended with: {}", e);
                }
            });
        }
        started
    }

    /// Refresh the credentials now, or wait for the episode already running.
    ///
    /// # Errors
    /// `MiniappError::RefreshFailed` when the episode fails.
    pub async fn refresh_now(self: &Arc<Self>) -> Result<(), MiniappError> {
        let (tx, rx) = oneshot::channel::<()>();
        self.enqueue_or_refresh(Box::new(move || {
            let _ = tx.send(());
        }));
        rx.await
            .map_err(|_| MiniappError::RefreshFailed("credential refresh failed".to_string()))
    }

    /// Park `task` and claim the refresh if none is running.
    ///
    /// Returns `true` when the caller claimed the episode and must start
    /// [`run_refresh`](Self::run_refresh).
    pub(crate) fn enqueue(&self, task: ReplayTask) -> bool {
        let mut state = self.state.lock();
        state.queue.push(task);
        if state.refreshing {
            false
        } else {
            state.refreshing = true;
            true
        }
    }

    /// Run one refresh episode to completion and drain the queue.
    ///
    /// Only the caller that claimed the episode through `enqueue` may call
    /// this. Should the episode unwind before it settles, the flag is reset
    /// and the parked tasks are dropped uninvoked.
    pub(crate) async fn run_refresh(&self) -> Result<(), MiniappError> {
        let mut episode = EpisodeGuard {
            coordinator: self,
            settled: false,
        };

        log::info!("[Miniapp] refreshing credentials");
        let outcome = self.refresh_credentials().await;
        let tasks = episode.settle();

        match outcome {
            Ok(()) => {
                log::info!(
                    "[Miniapp] credentials refreshed, replaying {} request(s)",
                    tasks.len()
                );
                self.interaction.hide_toast();
                self.interaction.show_toast(TOKEN_REFRESHED_NOTICE);
                for task in tasks {
                    task();
                }
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "[Miniapp] credential refresh failed, dropping {} request(s): {}",
                    tasks.len(),
                    e
                );
                drop(tasks);
                self.interaction.hide_toast();
                self.prompt_relogin(ReauthReason::RefreshFailed).await;
                Err(e)
            }
        }
    }

    async fn refresh_credentials(&self) -> Result<(), MiniappError> {
        let refresh_token = self
            .store
            .refresh_token()
            .await
            .ok_or_else(|| MiniappError::RefreshFailed("no refresh token held".to_string()))?;

        let grant = self
            .refresher
            .refresh(&refresh_token)
            .await
            .map_err(into_refresh_failure)?;

        self.store
            .write(grant)
            .await
            .map_err(into_refresh_failure)?;
        Ok(())
    }

    /// Ask the user to log in again. The credentials are cleared either way;
    /// on confirm the host navigates to the login page.
    pub(crate) async fn prompt_relogin(&self, reason: ReauthReason) {
        let prompt = reason.prompt();
        let confirmed = self.interaction.confirm(&prompt).await;

        if let Err(e) = self.store.clear().await {
            log::warn!("[Miniapp] failed to clear credentials: {}", e);
        }
        if confirmed {
            self.interaction.navigate_to(&self.login_page);
        }
    }
}

fn into_refresh_failure(e: MiniappError) -> MiniappError {
    match e {
        MiniappError::RefreshFailed(_) => e,
        other => MiniappError::RefreshFailed(other.to_string()),
    }
}

/// Resets the flag and drops the queue unless the episode settled normally.
struct EpisodeGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl EpisodeGuard<'_> {
    fn settle(&mut self) -> Vec<ReplayTask> {
        self.settled = true;
        let mut state = self.coordinator.state.lock();
        state.refreshing = false;
        std::mem::take(&mut state.queue)
    }
}

impl Drop for EpisodeGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let tasks = {
                let mut state = self.coordinator.state.lock();
                state.refreshing = false;
                std::mem::take(&mut state.queue)
            };
            log::warn!(
                "[Miniapp] refresh abandoned, dropping {} request(s)",
                tasks.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{ConfirmFuture, ConfirmPrompt};
    use crate::storage::MemoryStorage;
    use crate::types::{now_millis, CredentialState, DualCredential, DualTokenGrant, TokenMode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeRefresher {
        calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    impl FakeRefresher {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                delay: None,
            }
        }
    }

    impl TokenRefresher for FakeRefresher {
        fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail {
                    return Err(MiniappError::Business {
                        status: 200,
                        code: 500,
                        message: "refresh rejected".to_string(),
                    });
                }
                Ok(TokenGrant::Dual(DualTokenGrant {
                    access_token: format!("new_access_from_{refresh_token}"),
                    access_expires_in: 7200,
                    refresh_token: "new_refresh".to_string(),
                    refresh_expires_in: 86400,
                }))
            })
        }
    }

    #[derive(Default)]
    struct RecordingInteraction {
        events: Mutex<Vec<String>>,
        confirm: bool,
    }

    impl RecordingInteraction {
        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    impl Interaction for RecordingInteraction {
        fn show_toast(&self, message: &str) {
            self.events.lock().push(format!("toast:{message}"));
        }

        fn hide_toast(&self) {
            self.events.lock().push("hide".to_string());
        }

        fn confirm<'a>(&'a self, prompt: &'a ConfirmPrompt) -> ConfirmFuture<'a> {
            self.events.lock().push(format!("confirm:{}", prompt.title));
            let answer = self.confirm;
            Box::pin(async move { answer })
        }

        fn navigate_to(&self, url: &str) {
            self.events.lock().push(format!("navigate:{url}"));
        }
    }

    async fn dual_store() -> Arc<CredentialStore> {
        let store = Arc::new(CredentialStore::new(
            TokenMode::Dual,
            Arc::new(MemoryStorage::new()),
        ));
        store
            .restore(CredentialState::Dual(DualCredential {
                access_token: "old_access".to_string(),
                access_expires_at: now_millis() - 1,
                refresh_token: "r1".to_string(),
                refresh_expires_at: now_millis() + 600_000,
            }))
            .await
            .unwrap();
        store
    }

    fn coordinator(
        store: Arc<CredentialStore>,
        refresher: Arc<FakeRefresher>,
        interaction: Arc<RecordingInteraction>,
    ) -> RefreshCoordinator {
        RefreshCoordinator::new(store, refresher, interaction, "/pages/login/login")
    }

    #[tokio::test]
    async fn test_only_first_enqueue_claims_refresh() {
        let coordinator = coordinator(
            dual_store().await,
            Arc::new(FakeRefresher::ok()),
            Arc::new(RecordingInteraction::default()),
        );

        assert!(!coordinator.is_refreshing());
        assert!(coordinator.enqueue(Box::new(|| {})));
        assert!(!coordinator.enqueue(Box::new(|| {})));
        assert!(!coordinator.enqueue(Box::new(|| {})));
        assert!(coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 3);
    }

    #[tokio::test]
    async fn test_success_replays_in_enqueue_order() {
        let store = dual_store().await;
        let refresher = Arc::new(FakeRefresher::ok());
        let interaction = Arc::new(RecordingInteraction::default());
        let coordinator = coordinator(store.clone(), refresher.clone(), interaction.clone());

        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let order = Arc::clone(&order);
            coordinator.enqueue(Box::new(move || order.lock().push(i)));
        }

        coordinator.run_refresh().await.unwrap();

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
        assert_eq!(
            store.bearer_token().await.as_deref(),
            Some("new_access_from_r1")
        );
        assert_eq!(
            interaction.events(),
            vec!["hide".to_string(), format!("toast:{TOKEN_REFRESHED_NOTICE}")]
        );
    }

    #[tokio::test]
    async fn test_failure_drops_queue_and_prompts() {
        let store = dual_store().await;
        let refresher = Arc::new(FakeRefresher {
            fail: true,
            ..FakeRefresher::ok()
        });
        let interaction = Arc::new(RecordingInteraction {
            confirm: true,
            ..Default::default()
        });
        let coordinator = coordinator(store.clone(), refresher, interaction.clone());

        let invoked = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let invoked = Arc::clone(&invoked);
            coordinator.enqueue(Box::new(move || {
                invoked.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let err = coordinator.run_refresh().await.unwrap_err();
        assert!(matches!(err, MiniappError::RefreshFailed(ref m) if m.contains("refresh rejected")));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
        assert!(!store.has_login_info().await);
        assert_eq!(
            interaction.events(),
            vec![
                "hide".to_string(),
                "confirm:Login required".to_string(),
                "navigate:/pages/login/login".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_declined_prompt_clears_without_navigation() {
        let store = dual_store().await;
        let interaction = Arc::new(RecordingInteraction::default());
        let coordinator = coordinator(
            store.clone(),
            Arc::new(FakeRefresher::ok()),
            interaction.clone(),
        );

        coordinator.prompt_relogin(ReauthReason::Expired).await;

        assert!(!store.has_login_info().await);
        assert_eq!(interaction.events(), vec!["confirm:Login required".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_calling_refresher() {
        let store = Arc::new(CredentialStore::new(
            TokenMode::Dual,
            Arc::new(MemoryStorage::new()),
        ));
        let refresher = Arc::new(FakeRefresher::ok());
        let coordinator = coordinator(
            store,
            refresher.clone(),
            Arc::new(RecordingInteraction::default()),
        );

        assert!(coordinator.enqueue(Box::new(|| {})));
        let err = coordinator.run_refresh().await.unwrap_err();
        assert!(matches!(err, MiniappError::RefreshFailed(_)));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_episode_outlives_dropped_waiter() {
        let store = dual_store().await;
        let refresher = Arc::new(FakeRefresher {
            delay: Some(Duration::from_millis(100)),
            ..FakeRefresher::ok()
        });
        let coordinator = Arc::new(coordinator(
            store.clone(),
            refresher.clone(),
            Arc::new(RecordingInteraction::default()),
        ));

        let waiter = tokio::time::timeout(Duration::from_millis(20), coordinator.refresh_now()).await;
        assert!(waiter.is_err());
        assert!(coordinator.is_refreshing());

        let (tx, rx) = oneshot::channel::<()>();
        assert!(!coordinator.enqueue_or_refresh(Box::new(move || {
            let _ = tx.send(());
        })));
        rx.await.unwrap();

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.bearer_token().await.as_deref(),
            Some("new_access_from_r1")
        );
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_now_joins_running_episode() {
        let refresher = Arc::new(FakeRefresher {
            delay: Some(Duration::from_millis(50)),
            ..FakeRefresher::ok()
        });
        let coordinator = Arc::new(coordinator(
            dual_store().await,
            refresher.clone(),
            Arc::new(RecordingInteraction::default()),
        ));

        let (first, second) = tokio::join!(coordinator.refresh_now(), coordinator.refresh_now());
        first.unwrap();
        second.unwrap();
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_now_reports_failure() {
        let refresher = Arc::new(FakeRefresher {
            fail: true,
            ..FakeRefresher::ok()
        });
        let coordinator = Arc::new(coordinator(
            dual_store().await,
            refresher,
            Arc::new(RecordingInteraction::default()),
        ));

        let err = coordinator.refresh_now().await.unwrap_err();
        assert!(matches!(err, MiniappError::RefreshFailed(_)));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_unwound_episode_resets_flag() {
        let refresher = Arc::new(FakeRefresher {
            delay: Some(Duration::from_secs(30)),
            ..FakeRefresher::ok()
        });
        let coordinator = coordinator(
            dual_store().await,
            refresher,
            Arc::new(RecordingInteraction::default()),
        );

        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);
        assert!(coordinator.enqueue(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        let result =
            tokio::time::timeout(Duration::from_millis(50), coordinator.run_refresh()).await;
        assert!(result.is_err());

        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert!(coordinator.enqueue(Box::new(|| {})));
    }
}
