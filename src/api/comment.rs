//! Article comment API
//!
//! Comments arrive already threaded (`children`); rendering and thread
//! semantics are left to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::common::{Pagination, SortOrder};
use crate::api::r#trait::{ApiContext, MiniappApi};
use crate::client::RequestOptions;
use crate::error::MiniappError;

const COMMENTS_PATH: &str = "/api/comments";

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub is_deleted: bool,
    /// `approved`, `pending` or `rejected`
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub user_nickname: String,
    #[serde(default)]
    pub user_avatar: String,
    #[serde(default)]
    pub user_role: String,
    #[serde(default)]
    pub is_author: bool,
    #[serde(default)]
    pub reply_to_user_id: Option<i64>,
    #[serde(default)]
    pub reply_to_nickname: Option<String>,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub children: Vec<Comment>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommentList {
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommentStatistics {
    #[serde(default)]
    pub total_comments: u64,
    #[serde(default)]
    pub root_comments: u64,
    #[serde(default)]
    pub reply_comments: u64,
    #[serde(default)]
    pub total_likes: u64,
    #[serde(default)]
    pub today_comments: u64,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommentLike {
    pub is_liked: bool,
    #[serde(default)]
    pub like_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub article_id: i64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_user_id: Option<i64>,
}

impl NewComment {
    pub fn new(article_id: i64, content: impl Into<String>) -> Self {
        Self {
            article_id,
            content: content.into(),
            parent_id: None,
            reply_to_user_id: None,
        }
    }

    pub fn reply_to(mut self, parent_id: i64, user_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self.reply_to_user_id = Some(user_id);
        self
    }
}

#[derive(Debug, Deserialize)]
struct CreatedComment {
    comment: Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSort {
    CreatedAt,
    LikeCount,
}

impl CommentSort {
    fn as_str(self) -> &'static str {
        match self {
            CommentSort::CreatedAt => "created_at",
            CommentSort::LikeCount => "like_count",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort_by: Option<CommentSort>,
    pub order: Option<SortOrder>,
}

pub struct CommentApi {
    context: Arc<ApiContext>,
}

impl CommentApi {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    pub async fn article_comments(
        &self,
        article_id: i64,
        query: CommentQuery,
    ) -> Result<CommentList, MiniappError> {
        let options = RequestOptions::get(format!("{COMMENTS_PATH}/article/{article_id}"))
            .query_opt("page", query.page)
            .query_opt("per_page", query.per_page)
            .query_opt("sort_by", query.sort_by.map(CommentSort::as_str))
            .query_opt("order", query.order.map(SortOrder::as_str));
        self.context.fetch(options).await
    }

    pub async fn create(&self, comment: &NewComment) -> Result<Comment, MiniappError> {
        let created: CreatedComment = self
            .context
            .fetch(RequestOptions::post(format!("{COMMENTS_PATH}/create")).json(comment)?)
            .await?;
        Ok(created.comment)
    }

    /// Like the comment, or take the like back.
    pub async fn toggle_like(&self, comment_id: i64) -> Result<CommentLike, MiniappError> {
        self.context
            .fetch(RequestOptions::post(format!("{COMMENTS_PATH}/{comment_id}/like")))
            .await
    }

    pub async fn delete(&self, comment_id: i64) -> Result<(), MiniappError> {
        self.context
            .perform(RequestOptions::delete(format!("{COMMENTS_PATH}/{comment_id}/delete")))
            .await
    }

    pub async fn statistics(&self, article_id: i64) -> Result<CommentStatistics, MiniappError> {
        self.context
            .fetch(RequestOptions::get(format!("{COMMENTS_PATH}/statistics/{article_id}")))
            .await
    }

    pub async fn user_comments(
        &self,
        user_id: i64,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<CommentList, MiniappError> {
        let options = RequestOptions::get(format!("{COMMENTS_PATH}/user/{user_id}"))
            .query_opt("page", page)
            .query_opt("per_page", per_page);
        self.context.fetch(options).await
    }
}

impl MiniappApi for CommentApi {
    fn context(&self) -> &ApiContext {
        &self.context
    }

    fn api_name(&self) -> &'static str {
        "comment"
    }
}
