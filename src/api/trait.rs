//! API trait and context
//!
//! Every wrapper holds an [`ApiContext`] and reaches the network only
//! through its [`Transport`].

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::client::{RequestOptions, Transport};
use crate::error::MiniappError;
use crate::types::ApiResponse;

/// Shared resources for the API wrappers.
#[derive(Clone)]
pub struct ApiContext {
    pub(crate) transport: Transport,
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("transport", &"Transport { .. }")
            .finish()
    }
}

impl ApiContext {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Send `options` and unwrap the `data` of the envelope.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<T, MiniappError> {
        let response: ApiResponse<T> = self.transport.send(options).await?;
        response.into_data()
    }

    /// Send `options` for its side effect; any `data` is ignored.
    pub(crate) async fn perform(&self, options: RequestOptions) -> Result<(), MiniappError> {
        let _: ApiResponse<serde::de::IgnoredAny> = self.transport.send(options).await?;
        Ok(())
    }
}

/// Implemented by every API wrapper.
pub trait MiniappApi: Send + Sync {
    fn context(&self) -> &ApiContext;

    /// Short name of the API group.
    fn api_name(&self) -> &'static str {
        "unknown"
    }
}
