//! Mini-program shop client for Rust
//!
//! The API and session layer of a mini-program e-commerce front end: a
//! token-aware HTTP transport, typed wrappers for the shop backend, and a
//! login session that persists credentials across restarts.
//!
//! ## Token refresh
//!
//! When a request comes back unauthenticated while a refresh token is held,
//! exactly one refresh call is made no matter how many requests failed at
//! once. Every failed request waits in a queue and is replayed with the new
//! credentials when the refresh succeeds; when it fails the queue is
//! dropped, the credentials are cleared and the user is asked to log in
//! again.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use miniapp_client::{Miniapp, TokenMode};
//! use miniapp_client::api::auth::LoginForm;
//! use miniapp_client::storage::FileStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Miniapp::builder()
//!         .base_url("https://shop.example.com")
//!         .token_mode(TokenMode::Dual)
//!         .storage(Arc::new(FileStorage::new("session.json")))
//!         .build()?;
//!
//!     app.login(&LoginForm::with_username("alice", "secret")).await?;
//!
//!     let home = app.catalog().home_data().await?;
//!     println!("{} banners", home.banners.len());
//!
//!     app.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Shop backend modules (auth, cart, catalog, favorites, comments, articles)
//! - [`client`] - HTTP client, transport and the [`Miniapp`] facade
//! - [`refresh`] - Single-flight token refresh and the replay queue
//! - [`session`] - Login state and the cached user profile
//! - [`token`] - Credential store
//! - [`storage`] - Key-value persistence
//! - [`interaction`] - Toasts, prompts and navigation
//! - [`middleware`] - Tower layers around the HTTP client
//! - [`error`] - Error types
//! - [`types`] - Credential and response envelope types
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! use miniapp_client::MiniappError;
//!
//! match result {
//!     Ok(items) => { /* handle success */ }
//!     Err(MiniappError::AuthenticationExpired { .. }) => {
//!         // refresh was impossible or failed; the user has been prompted
//!     }
//!     Err(MiniappError::Business { code, message, .. }) => {
//!         eprintln!("rejected: {} - {}", code, message);
//!     }
//!     Err(e) => eprintln!("{}", e.user_message()),
//! }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod interaction;
pub mod middleware;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

pub use client::{HttpClient, Miniapp, MiniappBuilder, RequestOptions, Transport};
pub use error::MiniappError;
pub use interaction::{Interaction, LogInteraction};
pub use refresh::{RefreshCoordinator, TokenRefresher};
pub use session::Session;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use token::CredentialStore;
pub use types::{TokenGrant, TokenMode};
