//! Article API

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::common::Tag;
use crate::api::r#trait::{ApiContext, MiniappApi};
use crate::client::RequestOptions;
use crate::error::MiniappError;

/// Either a bare display name or a full author record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArticleAuthor {
    Name(String),
    Profile {
        id: i64,
        #[serde(default)]
        nickname: Option<String>,
        #[serde(default)]
        avatar: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl ArticleAuthor {
    pub fn display_name(&self) -> Option<&str> {
        match self {
            ArticleAuthor::Name(name) => Some(name.as_str()),
            ArticleAuthor::Profile { nickname, .. } => nickname.as_deref(),
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Article {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub author: Option<ArticleAuthor>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub comments: Option<u64>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleList {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub keyword: Option<String>,
}

/// Like counter after a like or unlike.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ArticleLikes {
    pub likes: u64,
}

pub struct ArticleApi {
    context: Arc<ApiContext>,
}

impl ArticleApi {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    pub async fn detail(&self, id: i64) -> Result<ArticleDetail, MiniappError> {
        self.context
            .fetch(RequestOptions::get(format!("/miniapp/article/{id}")))
            .await
    }

    pub async fn related(&self, article_id: i64, limit: u32) -> Result<Vec<Article>, MiniappError> {
        let options =
            RequestOptions::get(format!("/article/{article_id}/related")).query("limit", limit);
        self.context.fetch(options).await
    }

    pub async fn list(&self, query: &ArticleQuery) -> Result<ArticleList, MiniappError> {
        let options = RequestOptions::get("/article/list")
            .query_opt("page", query.page)
            .query_opt("limit", query.limit)
            .query_opt("category", query.category.as_deref())
            .query_opt("keyword", query.keyword.as_deref());
        self.context.fetch(options).await
    }

    pub async fn like(&self, id: i64) -> Result<ArticleLikes, MiniappError> {
        self.context
            .fetch(RequestOptions::post(format!("/article/{id}/like")))
            .await
    }

    pub async fn unlike(&self, id: i64) -> Result<ArticleLikes, MiniappError> {
        self.context
            .fetch(RequestOptions::delete(format!("/article/{id}/like")))
            .await
    }
}

impl MiniappApi for ArticleApi {
    fn context(&self) -> &ApiContext {
        &self.context
    }

    fn api_name(&self) -> &'static str {
        "article"
    }
}
