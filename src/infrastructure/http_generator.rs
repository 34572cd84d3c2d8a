// HTTP card generator - talks to the card generation endpoint over JSON
use crate::application::card_generator::{CardGenerator, Generation, GenerationError};
use crate::domain::card::ConversationHistory;
use crate::infrastructure::config::GenerationSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpCardGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    prompt: &'a str,
    conversation_history: &'a ConversationHistory,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    questions: Option<Vec<String>>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpCardGenerator {
    pub fn new(settings: &GenerationSettings) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Maps a raw response onto a generation result.
    fn interpret(status: u16, body: &str) -> Result<Generation, GenerationError> {
        let parsed = serde_json::from_str::<GenerateResponse>(body);

        if !(200..300).contains(&status) {
            let message = parsed.ok().and_then(|r| r.message.or(r.error));
            return Err(GenerationError::Upstream { status, message });
        }

        let response = parsed.map_err(|e| GenerationError::Malformed(e.to_string()))?;
        match (response.html, response.message) {
            (Some(html), _) => Ok(Generation::Content {
                html,
                questions: response.questions.unwrap_or_default(),
            }),
            (None, Some(message)) => Ok(Generation::Refused { message }),
            (None, None) => Err(GenerationError::Malformed(
                response
                    .error
                    .unwrap_or_else(|| "response has neither html nor message".to_string()),
            )),
        }
    }
}

#[async_trait]
impl CardGenerator for HttpCardGenerator {
    async fn generate(
        &self,
        prompt: &str,
        history: &ConversationHistory,
    ) -> Result<Generation, GenerationError> {
        let request = GenerateRequest {
            prompt,
            conversation_history: history,
        };

        let mut call = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        tracing::debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "Requesting card generation");
        let response = call
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Self::interpret(status, &body)
    }
}
