// Generation port - produces card HTML from a prompt and its conversation history
use crate::domain::card::ConversationHistory;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Generation {
    /// Usable output; `questions` are optional follow-ups suggested by the model.
    Content { html: String, questions: Vec<String> },
    /// The request was declined and must not be treated as card content.
    Refused { message: String },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("generation service returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Upstream { status: u16, message: Option<String> },

    #[error("malformed generation response: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Text suitable for showing next to the card that requested the build.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Upstream {
                message: Some(message),
                ..
            } => message.clone(),
            _ => "Failed to generate card".to_string(),
        }
    }
}

#[async_trait]
pub trait CardGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        history: &ConversationHistory,
    ) -> Result<Generation, GenerationError>;
}
