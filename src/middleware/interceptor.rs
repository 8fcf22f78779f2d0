//! Request interceptor that stamps every outgoing call.
//!
//! Adds the JSON content type, the `platform` header and, when a token is
//! held, `Authorization: Bearer <token>`. The token is read from the
//! [`CredentialStore`] at send time, so a request replayed after a refresh
//! carries the new token.
//!
//! # Example
//!
//! ```ignore
//! use tower::ServiceBuilder;
//! use miniapp_client::middleware::RequestInterceptor;
//!
//! let service = ServiceBuilder::new()
//!     .layer(RequestInterceptor::new(store, "mp-weixin"))
//!     .service(http_client);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Request;
use tower::{Layer, Service};

use crate::token::CredentialStore;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const PLATFORM_HEADER: &str = "platform";

#[derive(Clone)]
pub struct RequestInterceptor {
    store: Arc<CredentialStore>,
    platform: HeaderValue,
}

impl RequestInterceptor {
    /// An unrepresentable `platform` value is dropped with a warning.
    pub fn new(store: Arc<CredentialStore>, platform: &str) -> Self {
        let platform = HeaderValue::from_str(platform).unwrap_or_else(|e| {
            log::warn!("Invalid platform header {:?}: {}", platform, e);
            HeaderValue::from_static("")
        });
        Self { store, platform }
    }
}

impl<S> Layer<S> for RequestInterceptor {
    type Service = RequestInterceptorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestInterceptorService {
            inner,
            store: Arc::clone(&self.store),
            platform: self.platform.clone(),
        }
    }
}

pub struct RequestInterceptorService<S> {
    inner: S,
    store: Arc<CredentialStore>,
    platform: HeaderValue,
}

impl<S> Clone for RequestInterceptorService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            store: Arc::clone(&self.store),
            platform: self.platform.clone(),
        }
    }
}

impl<S> Service<Request> for RequestInterceptorService<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let store = Arc::clone(&self.store);
        let platform = self.platform.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let token = store.bearer_token().await;
            stamp_headers(&mut req, &platform, token.as_deref());
            inner.call(req).await
        })
    }
}

fn stamp_headers(req: &mut Request, platform: &HeaderValue, token: Option<&str>) {
    let headers = req.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    if !platform.is_empty() {
        headers.insert(PLATFORM_HEADER, platform.clone());
    }

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        headers.remove(AUTHORIZATION);
        return;
    };
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(e) => log::warn!("Token is not a valid header value: {}", e),
    }
}
