//! Transport facade
//!
//! The surface the API wrappers call. Every call goes through the
//! [`HttpClient`]; authentication failures are routed to the
//! [`RefreshCoordinator`] and, once a refresh succeeds, the request is issued
//! again through the full pipeline with the new credentials.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::client::http_client::HttpClient;
use crate::client::request::RequestOptions;
use crate::error::{non_empty_or, MiniappError, LOGIN_FAILED_NOTICE};
use crate::interaction::ReauthReason;
use crate::refresh::RefreshCoordinator;
use crate::token::CredentialStore;
use crate::types::TokenMode;

type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, MiniappError>> + Send + 'a>>;

#[derive(Clone)]
pub struct Transport {
    client: HttpClient,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("client", &self.client)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(
        client: HttpClient,
        store: Arc<CredentialStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            client,
            store,
            coordinator,
        }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MiniappError> {
        self.send(RequestOptions::get(url).query_pairs(query)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, MiniappError> {
        self.send(RequestOptions::post(url).json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, MiniappError> {
        self.send(RequestOptions::put(url).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MiniappError> {
        self.send(RequestOptions::delete(url).query_pairs(query)).await
    }

    /// Issue `options` and decode the whole JSON body into `T`.
    ///
    /// # Errors
    /// Whatever the executor reports, except that an authentication failure
    /// on a non-auth endpoint first goes through refresh coordination. A
    /// request parked behind a refresh that fails settles with its own
    /// original `AuthenticationExpired` error.
    pub async fn send<T: DeserializeOwned>(&self, options: RequestOptions) -> Result<T, MiniappError> {
        let value = self.dispatch(options).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn dispatch(&self, options: RequestOptions) -> DispatchFuture<'_> {
        Box::pin(async move {
            match self.client.execute(&options).await {
                Err(e) if e.is_authentication() => self.recover(options, e).await,
                other => other,
            }
        })
    }

    async fn recover(
        &self,
        options: RequestOptions,
        error: MiniappError,
    ) -> Result<Value, MiniappError> {
        if options.is_auth_endpoint() {
            if !options.hides_error_toast() {
                let message = match &error {
                    MiniappError::AuthenticationExpired { message, .. } => {
                        non_empty_or(message, LOGIN_FAILED_NOTICE)
                    }
                    _ => LOGIN_FAILED_NOTICE.to_string(),
                };
                self.client.interaction().show_toast(&message);
            }
            return Err(error);
        }

        match self.store.mode() {
            TokenMode::Single => {
                self.coordinator
                    .prompt_relogin(ReauthReason::NotLoggedIn)
                    .await;
                return Err(error);
            }
            TokenMode::Dual => {
                if self.store.refresh_token().await.is_none() {
                    self.coordinator.prompt_relogin(ReauthReason::Expired).await;
                    return Err(error);
                }
            }
        }

        let (tx, rx) = oneshot::channel::<()>();
        let started = self.coordinator.enqueue_or_refresh(Box::new(move || {
            let _ = tx.send(());
        }));
        log::debug!(
            "[Miniapp] {} {} parked behind refresh (started: {})",
            options.method(),
            options.url(),
            started
        );

        match rx.await {
            Ok(()) => self.dispatch(options).await,
            Err(_) => Err(error),
        }
    }
}
