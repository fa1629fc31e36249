pub mod prompt;

use async_trait::async_trait;
use rig::{client::CompletionClient, completion::Prompt, providers::groq};
use tracing::info;

pub use prompt::build_system_prompt;

pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u64 = 512;

/// Hosted LLM that answers one user message under a system prompt.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, system_prompt: &str, message: &str) -> anyhow::Result<String>;
}

/// Groq chat completions through `rig`.
pub struct GroqChatBackend {
    client: groq::Client,
    model: String,
}

impl GroqChatBackend {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        let model = model.into();
        info!("Chat assistant enabled with model {}", model);
        Self {
            client: groq::Client::new(api_key),
            model,
        }
    }
}

#[async_trait]
impl ChatBackend for GroqChatBackend {
    async fn reply(&self, system_prompt: &str, message: &str) -> anyhow::Result<String> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(system_prompt)
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS)
            .build();

        let response = agent.prompt(message).await?;
        Ok(response)
    }
}
