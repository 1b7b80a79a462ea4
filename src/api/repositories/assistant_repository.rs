use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;

use crate::api::connection::{ApiClient, ApiError};
use crate::models::chat::{ChatReply, ChatRequest};

#[derive(Error, Debug)]
pub enum AssistantRepositoryError {
    #[error("Assistant declined: {0}")]
    Declined(String),
    #[error("Assistant request failed: {0}")]
    ApiError(ApiError),
}

impl From<ApiError> for AssistantRepositoryError {
    fn from(error: ApiError) -> Self {
        match error {
            // 4xx bodies carry a reply meant for the shopper
            ApiError::Status { status: 400..=499, message } => AssistantRepositoryError::Declined(message),
            other => AssistantRepositoryError::ApiError(other),
        }
    }
}

/// Shopping assistant backed by the catalog
#[async_trait]
pub trait AssistantRepository: Send + Sync {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatReply, AssistantRepositoryError>;
}

/// HTTP implementation of AssistantRepository
pub struct HttpAssistantRepository {
    client: ApiClient,
}

impl HttpAssistantRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssistantRepository for HttpAssistantRepository {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatReply, AssistantRepositoryError> {
        Ok(self.client.send_json(Method::POST, "chat/", request, None).await?)
    }
}
