//! Generation Service Clients
//!
//! One trait over the LLM backends the pipeline can drive (OpenAI-compatible chat
//! completions, Anthropic messages, local Ollama). Clients return the raw text of the
//! model's reply; structure is recovered downstream. HTTP status codes are mapped onto
//! the transient (`RateLimited`, `Overloaded`) versus non-transient error taxonomy.

use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
}

/// Generation service client trait
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send one request and return the reply text
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Ollama => "ollama",
        }
    }

    fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderType::Ollama => None,
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "https://api.openai.com/v1",
            ProviderType::Anthropic => "https://api.anthropic.com/v1",
            ProviderType::Ollama => "http://localhost:11434/v1",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `[provider]` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: ProviderType,

    #[serde(default = "default_model")]
    pub model: String,

    /// Inline key; prefer `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the key (defaults per provider type)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Base URL override (e.g. an OpenAI-compatible gateway)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_provider_type() -> ProviderType {
    ProviderType::Anthropic
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_max_output_tokens() -> u32 {
    8192
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            model: default_model(),
            api_key: None,
            api_key_env: None,
            endpoint: None,
            max_output_tokens: default_max_output_tokens(),
            temperature: None,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from the inline value or the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<Option<String>, ProviderError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(Some(key.clone()));
        }
        let env_name = self
            .api_key_env
            .as_deref()
            .or_else(|| self.provider_type.default_api_key_env());
        match env_name {
            Some(name) => match std::env::var(name) {
                Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
                _ => Err(ProviderError::NotConfigured(format!(
                    "no API key for {} (set provider.api_key or ${})",
                    self.provider_type, name
                ))),
            },
            None => Ok(None),
        }
    }

    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.provider_type.default_endpoint().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("provider.model must not be empty".to_string());
        }
        if self.max_output_tokens == 0 {
            return Err("provider.max_output_tokens must be at least 1".to_string());
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("provider.temperature {} is outside 0.0..=2.0", t));
            }
        }
        Ok(())
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn map_status(status: u16, body: &str) -> ProviderError {
    let detail = format!("status {}: {}", status, body.trim());
    match status {
        429 => ProviderError::RateLimited(detail),
        503 | 529 => ProviderError::Overloaded(detail),
        401 | 403 => ProviderError::AuthFailed(detail),
        404 => ProviderError::ModelNotFound(detail),
        _ => ProviderError::RequestFailed(detail),
    }
}

fn map_http_error(error: reqwest::Error) -> ProviderError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        ProviderError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ProviderError::RequestFailed(format!("Connection error: {}", error))
    } else {
        ProviderError::RequestFailed(format!("HTTP error: {}", error))
    }
}

fn build_provider_http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(map_status(status.as_u16(), &body))
}

// OpenAI-compatible request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client (also used for Ollama)
pub struct OpenAIClient {
    client: Client,
    provider: ProviderType,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(
        provider: ProviderType,
        model: String,
        api_key: Option<String>,
        base_url: String,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_provider_http_client()?,
            provider,
            model,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl GenerationClient for OpenAIClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(map_http_error)?;
        let response = error_for_status(response).await?;

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("No content in response".to_string()))
    }

    fn provider_name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Anthropic messages API client
pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(model: String, api_key: String, base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_provider_http_client()?,
            model,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_output_tokens,
            "system": request.system,
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = error_for_status(response).await?;

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            text: String,
        }

        let completion: AnthropicResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let text: String = completion
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No text content in response".to_string(),
            ));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider factory for creating generation clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn GenerationClient>, ProviderError> {
        let api_key = config.resolve_api_key()?;
        let endpoint = config.endpoint();
        match config.provider_type {
            ProviderType::OpenAI | ProviderType::Ollama => Ok(Arc::new(OpenAIClient::new(
                config.provider_type,
                config.model.clone(),
                api_key,
                endpoint,
            )?)),
            ProviderType::Anthropic => {
                let api_key = api_key.ok_or_else(|| {
                    ProviderError::NotConfigured("anthropic requires an API key".to_string())
                })?;
                Ok(Arc::new(AnthropicClient::new(
                    config.model.clone(),
                    api_key,
                    endpoint,
                )?))
            }
        }
    }
}

// Mock client for testing
#[cfg(test)]
pub struct MockClient {
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<String, ProviderError>>>,
    requests: parking_lot::Mutex<Vec<GenerationRequest>>,
}

#[cfg(test)]
impl MockClient {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: parking_lot::Mutex::new(responses.into()),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl GenerationClient for MockClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.requests.lock().push(request.clone());
        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(ProviderError::InvalidResponse(
                "mock has no scripted response".to_string(),
            ))
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
