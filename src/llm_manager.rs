use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::impl_event_emitter;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait representing a text completion service.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Maximum context size in tokens.
    fn context_size(&self) -> usize;

    /// Send a prompt to the provider and return the response.
    async fn send_prompt(&self, prompt: &str) -> Result<String>;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }
}

/// Owns the configured provider and reports each call on the event bus.
pub struct LLMManager {
    provider: Box<dyn LLMProvider>,
    event_bus: Option<Arc<EventBus>>,
}

impl LLMManager {
    pub fn new(provider: Box<dyn LLMProvider>) -> Self {
        Self {
            provider,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Get the active provider.
    pub fn provider(&self) -> &dyn LLMProvider {
        &*self.provider
    }

    /// Send a prompt to the provider. Exactly one request, no retries.
    pub async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let provider = &self.provider;

        let _ = self
            .emit_event(Event::APICallStarted {
                provider: provider.name().to_string(),
                model: provider.model_name().to_string(),
            })
            .await;

        let result = provider.send_prompt(prompt).await;

        match &result {
            Ok(response) => {
                // Rough estimate: 1 token ≈ 4 characters
                let tokens = (prompt.len() + response.len()) / 4;
                let _ = self
                    .emit_event(Event::APICallCompleted {
                        provider: provider.name().to_string(),
                        tokens,
                    })
                    .await;
            }
            Err(e) => {
                let _ = self
                    .emit_event(Event::APIError {
                        provider: provider.name().to_string(),
                        error: format!("{:#}", e),
                    })
                    .await;
            }
        }

        result
    }
}

impl_event_emitter!(LLMManager);
