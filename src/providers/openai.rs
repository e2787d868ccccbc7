use crate::config::OpenAiConfig;
use crate::error::{Result, VecGraphError};
use crate::providers::{
    CompletionRequest, CompletionResponse, Embedding, EmbeddingProvider, Provider, ProviderInfo,
    Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible HTTP client serving both embeddings and chat completions.
pub struct OpenAiProvider {
    api_key: Option<String>,
    base_url: String,
    client: Client,
    embedding_model: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: builder.build()?,
            embedding_model: config
                .embedding_model
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            default_model: config
                .chat_model
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        })
    }

    pub fn static_info() -> ProviderInfo {
        ProviderInfo {
            name: "openai".to_string(),
            display_name: "OpenAI".to_string(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            VecGraphError::Authentication("OpenAI API key not configured".to_string())
        })
    }
}

fn parse_embedding_response(body: &str) -> Result<Embedding> {
    let response: EmbeddingResponse = serde_json::from_str(body)?;
    response
        .data
        .into_iter()
        .next()
        .map(|d| Embedding::new(d.embedding))
        .ok_or_else(|| VecGraphError::ApiRequest("Embedding response contained no data".to_string()))
}

fn parse_completion(data: &serde_json::Value, model: String) -> CompletionResponse {
    let content = data["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let finish_reason = data["choices"][0]["finish_reason"]
        .as_str()
        .map(|s| s.to_string());

    let usage = data.get("usage").map(|usage| Usage {
        prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
        total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
    });

    CompletionResponse {
        id: data["id"].as_str().unwrap_or("unknown").to_string(),
        model,
        content,
        finish_reason,
        usage,
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let api_key = self.api_key()?;
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(VecGraphError::ApiRequest(format!(
                "OpenAI embeddings error ({}): {}",
                status, body
            )));
        }

        let embedding = parse_embedding_response(&body)?;
        debug!(model = %self.embedding_model, dimensions = embedding.len(), "Embedding received");
        Ok(embedding)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn info(&self) -> ProviderInfo {
        Self::static_info()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_key = self.api_key()?;

        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature.unwrap_or(0.0),
            "max_tokens": request.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VecGraphError::ApiRequest(format!(
                "OpenAI API error: {}",
                error_text
            )));
        }

        let data: serde_json::Value = response.json().await?;
        Ok(parse_completion(&data, request.model))
    }

    fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }
}
