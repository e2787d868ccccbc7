use crate::chain::ChainOutput;
use crate::error::Result;
use crate::providers::{CompletionRequest, Message, Provider, Role};
use std::sync::Arc;
use tracing::info;

const SYSTEM_PROMPT: &str = "You are an assistant that answers questions using facts from a knowledge graph. \
Each context line has the form `<subject> <RELATIONSHIP> <object>`. \
Answer only from the context; if it does not contain the answer, say you don't know.";

/// Turns graph context into a natural-language answer with a chat model.
pub struct AnswerSynthesizer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl AnswerSynthesizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn build_request(&self, question: &str, context: &ChainOutput) -> CompletionRequest {
        let context_text = context.lines().collect::<Vec<_>>().join("\n");
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message::new(Role::System, SYSTEM_PROMPT),
                Message::new(
                    Role::User,
                    format!("Context:\n{}\n\nQuestion: {}", context_text, question),
                ),
            ],
            temperature: Some(self.temperature),
            max_tokens: None,
        }
    }

    pub async fn answer(&self, question: &str, context: &ChainOutput) -> Result<String> {
        let request = self.build_request(question, context);
        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            info!(
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                "Token usage"
            );
        }
        Ok(response.content)
    }
}
