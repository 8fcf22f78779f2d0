//! Mini-program backend API modules
//!
//! Thin typed wrappers over the [`Transport`](crate::client::Transport).
//! Each call decodes the `{code, message, data}` envelope and returns `data`.
//!
//! - [`common`] - Shared paging primitives and tags
//! - [`auth`] - Login, registration, logout, refresh, profile, password reset
//! - [`cart`] - Shopping cart
//! - [`catalog`] - Home page, banners, categories, products
//! - [`favorite`] - Article and product favorites
//! - [`comment`] - Article comments
//! - [`article`] - Articles and likes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use miniapp_client::Miniapp;
//!
//! let app = Miniapp::builder().base_url("https://shop.example.com").build()?;
//! let items = app.cart().list().await?;
//! ```

pub mod article;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod comment;
pub mod common;
pub mod favorite;
pub mod r#trait;

pub use article::ArticleApi;
pub use auth::{AuthApi, AuthRefresher};
pub use cart::CartApi;
pub use catalog::CatalogApi;
pub use comment::CommentApi;
pub use favorite::FavoriteApi;
pub use r#trait::{ApiContext, MiniappApi};
