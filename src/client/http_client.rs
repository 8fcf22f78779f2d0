//! Request executor
//!
//! Issues exactly one network call per [`RequestOptions`] and maps the
//! transport status and the business `code` to one outcome.

use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

use crate::client::request::RequestOptions;
use crate::error::{HttpError, MiniappError};
use crate::interaction::{Interaction, LogInteraction};
use crate::types::ResultCode;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub(crate) type MiddlewareFuture =
    Pin<Box<dyn Future<Output = Result<reqwest::Response, reqwest::Error>> + Send>>;
pub(crate) type MiddlewareExecutor =
    Arc<dyn Fn(reqwest::Request) -> MiddlewareFuture + Send + Sync>;

/// Single-call HTTP executor.
///
/// Requests go through the middleware pipeline configured by the builder
/// (interceptor first, then any user layer); cloning is cheap.
#[derive(Clone)]
pub struct HttpClient {
    http: Client,
    base_url: String,
    interaction: Arc<dyn Interaction>,
    middleware_executor: Option<MiddlewareExecutor>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field(
                "middleware_executor",
                &self.middleware_executor.as_ref().map(|_| ".."),
            )
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying [`reqwest::Client`] for raw HTTP requests.
    ///
    /// Note: requests made through this client bypass the middleware pipeline,
    /// including bearer-token injection.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn interaction(&self) -> &Arc<dyn Interaction> {
        &self.interaction
    }

    pub(crate) fn with_middleware_executor(mut self, executor: MiddlewareExecutor) -> Self {
        self.middleware_executor = Some(executor);
        self
    }

    pub(crate) async fn send_request(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, reqwest::Error> {
        if let Some(executor) = &self.middleware_executor {
            (executor)(request).await
        } else {
            self.http.execute(request).await
        }
    }

    fn build_request(&self, options: &RequestOptions) -> Result<reqwest::Request, MiniappError> {
        let url = options.resolve_url(&self.base_url);
        let mut builder = self
            .http
            .request(options.method().clone(), url)
            .headers(options.headers().clone());
        if let Some(body) = options.json_body() {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    /// Perform one call and classify the answer.
    ///
    /// Failures other than authentication show a transient notice unless
    /// the request opted out. Authentication failures are left to the
    /// caller, which decides between refreshing and prompting.
    ///
    /// # Errors
    /// - `MiniappError::Http(Transport)` when no response arrived
    /// - `MiniappError::RateLimited` for business code or status 429
    /// - `MiniappError::AuthenticationExpired` for status or business code 401
    /// - `MiniappError::Business` for any other non-success answer
    pub async fn execute(&self, options: &RequestOptions) -> Result<Value, MiniappError> {
        let result = self.execute_once(options).await;

        if let Err(e) = &result {
            log::debug!(
                "[Miniapp] {} {} failed: {}",
                options.method(),
                options.url(),
                e
            );
            if !options.hides_error_toast() {
                if let Some(message) = e.user_message() {
                    self.interaction.show_toast(&message);
                }
            }
        }

        result
    }

    async fn execute_once(&self, options: &RequestOptions) -> Result<Value, MiniappError> {
        let request = self.build_request(options)?;
        let response = self.send_request(request).await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<Value>(&bytes).ok();

        log::debug!(
            "[Miniapp] {} {} -> {}",
            options.method(),
            options.url(),
            status
        );

        classify(status, body)
    }
}

/// Map a transport status and decoded body to an outcome.
pub(crate) fn classify(status: u16, body: Option<Value>) -> Result<Value, MiniappError> {
    let code = body
        .as_ref()
        .and_then(|b| b.get("code"))
        .and_then(Value::as_i64);
    let message = body
        .as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if (200..300).contains(&status) {
        let body = body.ok_or_else(|| {
            MiniappError::Http(HttpError::Decode(format!(
                "status {status} with a non-JSON body"
            )))
        })?;
        return match code {
            Some(ResultCode::TOO_MANY_REQUESTS) => Err(MiniappError::RateLimited {
                code: ResultCode::TOO_MANY_REQUESTS,
                message,
            }),
            Some(ResultCode::UNAUTHORIZED) => {
                Err(MiniappError::AuthenticationExpired { status, message })
            }
            Some(code) if ResultCode::is_success(code) => Ok(body),
            Some(code) => Err(MiniappError::Business {
                status,
                code,
                message,
            }),
            None => Err(MiniappError::Http(HttpError::Decode(format!(
                "status {status} without a business code"
            )))),
        };
    }

    if status == 401 || code == Some(ResultCode::UNAUTHORIZED) {
        return Err(MiniappError::AuthenticationExpired { status, message });
    }
    if status == 429 || code == Some(ResultCode::TOO_MANY_REQUESTS) {
        return Err(MiniappError::RateLimited {
            code: code.unwrap_or(ResultCode::TOO_MANY_REQUESTS),
            message,
        });
    }
    Err(MiniappError::Business {
        status,
        code: code.unwrap_or(i64::from(status)),
        message,
    })
}

impl Service<reqwest::Request> for HttpClient {
    type Response = reqwest::Response;
    type Error = reqwest::Error;
    type Future = MiddlewareFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: reqwest::Request) -> Self::Future {
        let client = self.http.clone();
        Box::pin(async move { client.execute(req).await })
    }
}

/// Builder for HttpClient
///
/// # Example
///
/// ```rust
/// use miniapp_client::client::HttpClient;
///
/// let client = HttpClient::builder()
///     .base_url("https://shop.example.com")
///     .build()
///     .unwrap();
/// assert_eq!(client.base_url(), "https://shop.example.com");
/// ```
#[derive(Default)]
pub struct HttpClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    interaction: Option<Arc<dyn Interaction>>,
}

impl std::fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClientBuilder {
    /// Set the base URL relative request paths are joined onto
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the total timeout for requests
    ///
    /// Default: 60 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Where error notices go. Default: [`LogInteraction`]
    pub fn interaction(mut self, interaction: Arc<dyn Interaction>) -> Self {
        self.interaction = Some(interaction);
        self
    }

    /// Build the HttpClient
    ///
    /// # Errors
    /// Returns an error if base_url is missing or not an http(s) URL
    pub fn build(self) -> Result<HttpClient, MiniappError> {
        let base_url = self
            .base_url
            .ok_or_else(|| MiniappError::Config("base_url is required".to_string()))?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(MiniappError::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let connect_timeout = self
            .connect_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(HttpClient {
            http: client,
            base_url,
            interaction: self
                .interaction
                .unwrap_or_else(|| Arc::new(LogInteraction)),
            middleware_executor: None,
        })
    }
}
