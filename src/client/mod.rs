//! HTTP client and transport
//!
//! [`HttpClient`] issues one request and classifies the answer,
//! [`Transport`] adds the authentication recovery on top, and [`Miniapp`]
//! ties both to the API modules and the login session.

mod http_client;
pub use http_client::{HttpClient, HttpClientBuilder};

mod request;
pub use request::RequestOptions;

mod transport;
pub use transport::Transport;

mod miniapp;
pub use miniapp::Miniapp;

mod builder;
pub use builder::{MiniappBuilder, DEFAULT_LOGIN_PAGE, DEFAULT_PLATFORM};
