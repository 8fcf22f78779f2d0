//! Favorites API

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::common::Pagination;
use crate::api::r#trait::{ApiContext, MiniappApi};
use crate::client::RequestOptions;
use crate::error::MiniappError;

pub const FAVORITE_PATH: &str = "/miniapp/api/favorite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteType {
    Article,
    Product,
}

impl FavoriteType {
    pub fn as_str(self) -> &'static str {
        match self {
            FavoriteType::Article => "article",
            FavoriteType::Product => "product",
        }
    }
}

/// Item reference used by toggle and check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FavoriteTarget {
    pub item_type: FavoriteType,
    pub item_id: i64,
}

impl FavoriteTarget {
    pub fn article(item_id: i64) -> Self {
        Self {
            item_type: FavoriteType::Article,
            item_id,
        }
    }

    pub fn product(item_id: i64) -> Self {
        Self {
            item_type: FavoriteType::Product,
            item_id,
        }
    }
}

/// Favorite state of one item after toggle or check.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FavoriteStatus {
    pub is_favorited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<FavoriteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FavoriteItem {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub item_type: FavoriteType,
    pub item_id: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub item_title: String,
    #[serde(default)]
    pub item_image: String,
    #[serde(default)]
    pub item_description: String,
    /// Article or product record, depending on `item_type`
    #[serde(default)]
    pub item_detail: Option<serde_json::Value>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FavoriteList {
    #[serde(default)]
    pub favorites: Vec<FavoriteItem>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FavoriteStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub article: u64,
    #[serde(default)]
    pub product: u64,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemovedFavorites {
    #[serde(default)]
    pub removed_count: u64,
    #[serde(default)]
    pub item_type: Option<FavoriteType>,
}

#[derive(Debug, Serialize)]
struct BatchRemoveRequest<'a> {
    favorite_ids: &'a [i64],
}

#[derive(Debug, Serialize)]
struct ClearRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    item_type: Option<FavoriteType>,
}

pub struct FavoriteApi {
    context: Arc<ApiContext>,
}

impl FavoriteApi {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    /// Add the item if absent, remove it if present.
    pub async fn toggle(&self, target: FavoriteTarget) -> Result<FavoriteStatus, MiniappError> {
        self.context
            .fetch(RequestOptions::post(format!("{FAVORITE_PATH}/toggle")).json(&target)?)
            .await
    }

    pub async fn check(&self, target: FavoriteTarget) -> Result<FavoriteStatus, MiniappError> {
        self.context
            .fetch(RequestOptions::post(format!("{FAVORITE_PATH}/check")).json(&target)?)
            .await
    }

    pub async fn list(
        &self,
        item_type: Option<FavoriteType>,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<FavoriteList, MiniappError> {
        let options = RequestOptions::get(format!("{FAVORITE_PATH}/list"))
            .query_opt("type", item_type.map(FavoriteType::as_str))
            .query_opt("page", page)
            .query_opt("per_page", per_page);
        self.context.fetch(options).await
    }

    pub async fn stats(&self) -> Result<FavoriteStats, MiniappError> {
        self.context
            .fetch(RequestOptions::get(format!("{FAVORITE_PATH}/count")))
            .await
    }

    pub async fn batch_remove(&self, favorite_ids: &[i64]) -> Result<RemovedFavorites, MiniappError> {
        let body = BatchRemoveRequest { favorite_ids };
        self.context
            .fetch(RequestOptions::post(format!("{FAVORITE_PATH}/remove")).json(&body)?)
            .await
    }

    /// Remove every favorite, or only those of `item_type`.
    pub async fn clear(&self, item_type: Option<FavoriteType>) -> Result<RemovedFavorites, MiniappError> {
        let body = ClearRequest { item_type };
        self.context
            .fetch(RequestOptions::post(format!("{FAVORITE_PATH}/clear")).json(&body)?)
            .await
    }
}

impl MiniappApi for FavoriteApi {
    fn context(&self) -> &ApiContext {
        &self.context
    }

    fn api_name(&self) -> &'static str {
        "favorite"
    }
}
