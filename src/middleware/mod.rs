//! Middleware components
//!
//! Cross-cutting request concerns as tower layers around the raw
//! [`HttpClient`](crate::client::HttpClient).
//!
//! ## Middleware Types
//!
//! - [`RequestInterceptor`] - Stamps content type, platform and bearer token
//! - [`LoggingMiddleware`] - Logs request/response information
//!
//! ## Usage
//!
//! ```ignore
//! use miniapp_client::Miniapp;
//! use miniapp_client::middleware::LoggingMiddleware;
//!
//! let app = Miniapp::builder()
//!     .base_url("https://shop.example.com")
//!     .with_middleware(LoggingMiddleware::new().verbose())
//!     .build()?;
//! ```

// Re-export tower types for convenience
pub use tower::{Layer, Service, ServiceBuilder};

mod interceptor;
mod logging;

pub use interceptor::{RequestInterceptor, RequestInterceptorService, JSON_CONTENT_TYPE, PLATFORM_HEADER};
pub use logging::{LoggingMiddleware, LoggingMiddlewareService};
