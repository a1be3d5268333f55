pub mod persona;

use async_trait::async_trait;
use rig::completion::Chat;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use tracing::{debug, error, warn};

use crate::errors::AppError;
use crate::models::{HistoryEntry, Role};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// One turn sent to the generative-language API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiRequest {
    pub system_instruction: String,
    pub history: Vec<HistoryEntry>,
    pub message: String,
}

/// The generative-language collaborator. Returns the raw reply text.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn send(&self, request: AiRequest) -> Result<String, AppError>;
}

/// Builds a rig [`RigMessage`] history list from the session transcript.
fn to_rig_history(history: &[HistoryEntry]) -> Vec<RigMessage> {
    history
        .iter()
        .map(|entry| match entry.role {
            Role::User => RigMessage::user(&entry.text),
            Role::Model => RigMessage::assistant(&entry.text),
        })
        .collect()
}

/// [`AiClient`] backed by Google Gemini through rig.
/// A fresh agent is built per request so the persona preamble and transcript
/// are replayed each time.
#[derive(Clone)]
pub struct GeminiAgentService {
    client: Option<gemini::Client>,
    model: String,
}

impl GeminiAgentService {
    /// Without an API key the service still constructs; every request then
    /// fails with [`AppError::AgentNotConfigured`].
    pub fn new(api_key: Option<&str>, model: &str) -> Result<Self, AppError> {
        let client = match api_key {
            Some(key) => Some(
                gemini::Client::builder()
                    .api_key(key)
                    .build()
                    .map_err(|e| AppError::Unexpected(format!("Failed to build Gemini client: {e}")))?,
            ),
            None => {
                warn!("GEMINI_API_KEY is not set; every chat turn will fail");
                None
            }
        };
        Ok(Self { client, model: model.to_string() })
    }
}

#[async_trait]
impl AiClient for GeminiAgentService {
    async fn send(&self, request: AiRequest) -> Result<String, AppError> {
        let client = self.client.as_ref().ok_or_else(|| AppError::AgentNotConfigured {
            reason: "API key is missing".to_string(),
        })?;

        let agent = client
            .agent(&self.model)
            .preamble(&request.system_instruction)
            .build();

        debug!(
            model = %self.model,
            history_len = request.history.len(),
            "Sending chat turn to Gemini"
        );

        agent
            .chat(request.message.as_str(), to_rig_history(&request.history))
            .await
            .map_err(|e| {
                error!("Gemini inference failed: {e}");
                AppError::InferenceError { message: e.to_string() }
            })
    }
}
