use std::sync::Arc;
use std::time::Duration;

use reqwest::{Request as ReqwestRequest, Response as ReqwestResponse};
use tower::{Layer, Service};

use crate::api::{ApiContext, AuthApi, AuthRefresher};
use crate::error::MiniappError;
use crate::interaction::{Interaction, LogInteraction};
use crate::middleware::RequestInterceptor;
use crate::refresh::{RefreshCoordinator, TokenRefresher};
use crate::session::Session;
use crate::storage::{MemoryStorage, Storage};
use crate::token::CredentialStore;
use crate::types::TokenMode;

use super::http_client::{
    HttpClient, MiddlewareExecutor, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
};
use super::{Miniapp, Transport};

pub const DEFAULT_LOGIN_PAGE: &str = "/pages/login/login";
pub const DEFAULT_PLATFORM: &str = "mp-weixin";

#[must_use]
#[derive(Default)]
pub struct MiniappBuilder<M = ()> {
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    token_mode: TokenMode,
    login_page: Option<String>,
    platform: Option<String>,
    storage: Option<Arc<dyn Storage>>,
    interaction: Option<Arc<dyn Interaction>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    middleware: Option<M>,
}

impl<M> std::fmt::Debug for MiniappBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniappBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("token_mode", &self.token_mode)
            .field("login_page", &self.login_page)
            .field("platform", &self.platform)
            .field("middleware", &self.middleware.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

impl<M> MiniappBuilder<M> {
    /// Backend origin relative request paths are joined onto. Required.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Credential shape of the deployment. Default: [`TokenMode::Dual`]
    pub fn token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }

    /// Page the user is sent to after confirming a re-login prompt.
    pub fn login_page(mut self, page: impl Into<String>) -> Self {
        self.login_page = Some(page.into());
        self
    }

    /// Value of the `platform` request header.
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Where credentials and the profile persist. Default: [`MemoryStorage`]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Toasts, prompts and navigation. Default: [`LogInteraction`]
    pub fn interaction(mut self, interaction: Arc<dyn Interaction>) -> Self {
        self.interaction = Some(interaction);
        self
    }

    /// Replace the default `POST /auth/refreshToken` refresher.
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Wrap the raw HTTP client in a tower layer. The request interceptor
    /// runs outside it, so the layer sees the stamped headers.
    pub fn with_middleware<M2>(self, middleware: M2) -> MiniappBuilder<M2>
    where
        M2: Layer<HttpClient> + Clone + Send + Sync + 'static,
    {
        MiniappBuilder {
            base_url: self.base_url,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            token_mode: self.token_mode,
            login_page: self.login_page,
            platform: self.platform,
            storage: self.storage,
            interaction: self.interaction,
            refresher: self.refresher,
            middleware: Some(middleware),
        }
    }

    /// # Errors
    /// - `MiniappError::Config` if base_url is missing or not http(s)
    /// - `MiniappError::Storage` if persisted state cannot be read
    pub fn build(self) -> Result<Miniapp, MiniappError>
    where
        M: Layer<HttpClient> + Clone + Send + Sync + 'static,
        M::Service: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <M::Service as Service<ReqwestRequest>>::Future: Send + 'static,
    {
        let base_url = self
            .base_url
            .ok_or_else(|| MiniappError::Config("base_url is required".to_string()))?;

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let connect_timeout = self
            .connect_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));
        let interaction = self
            .interaction
            .unwrap_or_else(|| Arc::new(LogInteraction));
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        let store = Arc::new(CredentialStore::load(self.token_mode, Arc::clone(&storage))?);

        let raw = HttpClient::builder()
            .base_url(base_url)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .interaction(Arc::clone(&interaction))
            .build()?;

        let platform = self.platform.as_deref().unwrap_or(DEFAULT_PLATFORM);
        let interceptor = RequestInterceptor::new(Arc::clone(&store), platform);
        let executor = match self.middleware {
            Some(middleware) => {
                make_middleware_executor(interceptor.layer(middleware.layer(raw.clone())))
            }
            None => make_middleware_executor(interceptor.layer(raw.clone())),
        };
        let client = raw.with_middleware_executor(executor);

        let refresher = self
            .refresher
            .unwrap_or_else(|| Arc::new(AuthRefresher::new(client.clone())));
        let login_page = self
            .login_page
            .unwrap_or_else(|| DEFAULT_LOGIN_PAGE.to_string());
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&store),
            refresher,
            interaction,
            login_page,
        ));

        let transport = Transport::new(client, Arc::clone(&store), coordinator);
        let context = Arc::new(ApiContext::new(transport));
        let session = Arc::new(Session::new(
            AuthApi::new(Arc::clone(&context)),
            store,
            storage,
        ));

        Ok(Miniapp::new(context, session))
    }
}

fn make_middleware_executor<S>(service: S) -> MiddlewareExecutor
where
    S: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let service = Arc::new(service);

    Arc::new(move |request: ReqwestRequest| {
        let mut service = (*service).clone();
        Box::pin(async move { service.call(request).await })
    })
}
