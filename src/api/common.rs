//! Shared paging and listing primitives
//!
//! Backend listings come in two paging shapes:
//!
//! - [`Pagination`]: `{page, per_page, total, pages, has_next, has_prev}`,
//!   used by favorites and comments
//! - [`Paginated`]: `{items, pagination: {page, limit, total, pages}}`, used
//!   by the home page listings
//!
//! ```rust
//! use miniapp_client::api::common::Pagination;
//!
//! let json = r#"{"page": 2, "per_page": 10, "total": 35, "pages": 4, "has_next": true}"#;
//! let page: Pagination = serde_json::from_str(json).unwrap();
//! assert!(page.has_next);
//! assert!(!page.has_prev);
//! ```

use serde::{Deserialize, Serialize};

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default, alias = "per_page")]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub pagination: PageInfo,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tag {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}
