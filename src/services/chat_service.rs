use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    api::repositories::{AssistantRepository, AssistantRepositoryError},
    models::chat::{ChatMessage, ChatRequest, Speaker, ASSISTANT_GREETING},
};

pub const ASSISTANT_UNAVAILABLE: &str = "The assistant is not reachable right now. Please try again.";

#[derive(Error, Debug)]
pub enum ChatServiceError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Repository error: {0}")]
    RepositoryError(#[from] AssistantRepositoryError),
}

/// One conversation with the shopping assistant. The transcript opens with a
/// greeting and every failed turn still gets an assistant line.
pub struct ChatService {
    assistant: Arc<dyn AssistantRepository>,
    transcript: Vec<ChatMessage>,
}

impl ChatService {
    pub fn new(assistant: Arc<dyn AssistantRepository>) -> Self {
        Self {
            assistant,
            transcript: vec![ChatMessage::new(Speaker::Assistant, ASSISTANT_GREETING)],
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Blank messages are rejected without a request.
    pub async fn send(&mut self, message: &str) -> Result<String, ChatServiceError> {
        let request = ChatRequest::new(message).map_err(|e| ChatServiceError::ValidationError {
            message: format!("Message validation failed: {}", e),
        })?;

        self.transcript
            .push(ChatMessage::new(Speaker::User, request.message.clone()));
        debug!("Asking assistant ({} chars)", request.message.len());

        match self.assistant.ask(&request).await {
            Ok(reply) if !reply.reply.trim().is_empty() => {
                self.transcript
                    .push(ChatMessage::new(Speaker::Assistant, reply.reply.clone()));
                Ok(reply.reply)
            }
            Ok(_) => {
                warn!("Assistant answered with an empty reply");
                self.transcript
                    .push(ChatMessage::new(Speaker::Assistant, ASSISTANT_UNAVAILABLE));
                Ok(ASSISTANT_UNAVAILABLE.to_string())
            }
            Err(e) => {
                warn!("Assistant request failed: {}", e);
                let line = match &e {
                    AssistantRepositoryError::Declined(text) => text.clone(),
                    AssistantRepositoryError::ApiError(_) => ASSISTANT_UNAVAILABLE.to_string(),
                };
                self.transcript.push(ChatMessage::new(Speaker::Assistant, line));
                Err(e.into())
            }
        }
    }
}
