//! AI backend abstraction.
//!
//! Supports multiple AI backends:
//! - Local: Ollama
//! - Hosted agent runner: any OpenAI-compatible chat endpoint, optionally
//!   given MCP tool servers (e.g. web search)
//! - Remote: Anthropic (feature-flagged)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AgentError;

/// AI backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend")]
pub enum AiBackendConfig {
    /// Local Ollama instance
    #[serde(rename = "ollama")]
    Ollama {
        base_url: String,
        model: String,
        #[serde(default = "default_timeout")]
        timeout_seconds: u64,
    },

    /// Hosted agent runner with an OpenAI-compatible chat API
    #[serde(rename = "runner")]
    Runner {
        base_url: String,
        api_key_env: String,
        model: String,
        #[serde(default = "default_timeout")]
        timeout_seconds: u64,
    },

    /// Anthropic API (requires feature flag)
    #[cfg(feature = "remote-ai")]
    #[serde(rename = "anthropic")]
    Anthropic {
        api_key_env: String,
        model: String,
        #[serde(default = "default_timeout")]
        timeout_seconds: u64,
    },
}

fn default_timeout() -> u64 {
    120
}

impl Default for AiBackendConfig {
    fn default() -> Self {
        AiBackendConfig::Ollama {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// A message in a conversation with the AI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request to the AI backend.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
    /// Tool servers the model may call (only honoured by the agent runner)
    pub tools: Vec<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            json_mode: false,
            tools: Vec::new(),
        }
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }
}

/// Response from the AI backend.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for AI backends.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Send a chat completion request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AgentError>;

    /// Check if the backend is available.
    async fn health_check(&self) -> Result<bool, AgentError>;
}

fn build_client(timeout_seconds: u64) -> Result<reqwest::Client, AgentError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| AgentError::BackendUnavailable(format!("HTTP client: {}", e)))
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(500).collect();
    format!("{}: {}", status, snippet)
}

/// Send `body` as JSON and decode a successful reply. One attempt only.
async fn send_json<B: Serialize, R: DeserializeOwned>(
    backend: &str,
    builder: reqwest::RequestBuilder,
    body: &B,
) -> Result<R, AgentError> {
    let response = builder
        .json(body)
        .send()
        .await
        .map_err(|e| AgentError::BackendUnavailable(format!("{}: {}", backend, e)))?;

    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        return Err(AgentError::RateLimited(retry_after));
    }

    if !response.status().is_success() {
        return Err(AgentError::BackendUnavailable(format!(
            "{} returned {}",
            backend,
            error_body(response).await
        )));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| AgentError::ResponseParseError(format!("{}: {}", backend, e)))
}

// --- Ollama backend ---

/// Ollama backend implementation.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: String, model: String, timeout_seconds: u64) -> Result<Self, AgentError> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            base_url,
            model,
        })
    }
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<ChatMessage> for WireMessage {
    fn from(m: ChatMessage) -> Self {
        Self {
            role: m.role.as_str().to_string(),
            content: m.content,
        }
    }
}

#[derive(Debug, Serialize, Default)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[async_trait]
impl AiBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AgentError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        if !request.tools.is_empty() {
            debug!("Ollama ignores tool servers: {:?}", request.tools);
        }

        let ollama_request = OllamaRequest {
            model: self.model.clone(),
            messages: request.messages.into_iter().map(WireMessage::from).collect(),
            stream: false,
            format: request.json_mode.then(|| "json".to_string()),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        debug!("Sending request to Ollama: {}", url);
        let reply: OllamaResponse =
            send_json("Ollama", self.client.post(&url), &ollama_request).await?;

        let tokens_used = match (reply.prompt_eval_count, reply.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        Ok(ChatResponse {
            content: reply.message.content,
            model: reply.model,
            tokens_used,
        })
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        let url = format!("{}/api/tags", self.base_url.trim_end_matches('/'));

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// --- Hosted agent runner ---

#[derive(Debug, Serialize)]
struct RunnerRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mcp_servers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct RunnerResponse {
    choices: Vec<RunnerChoice>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: Option<RunnerUsage>,
}

#[derive(Debug, Deserialize)]
struct RunnerChoice {
    message: RunnerMessage,
}

#[derive(Debug, Deserialize)]
struct RunnerMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunnerUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// OpenAI-compatible hosted agent runner.
///
/// A missing API key is not fatal: requests are still attempted and fail at
/// the upstream, which callers treat like any other outage.
pub struct RunnerBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl RunnerBackend {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout_seconds: u64,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            base_url,
            model,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AiBackend for RunnerBackend {
    fn name(&self) -> &'static str {
        "runner"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AgentError> {
        let body = RunnerRequest {
            model: self.model.clone(),
            messages: request.messages.into_iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
            mcp_servers: request.tools,
        };

        let url = self.completions_url();
        debug!("Sending request to agent runner: {}", url);

        let mut builder = self.client.post(&url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let parsed: RunnerResponse = send_json("Agent runner", builder, &body).await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AgentError::ResponseParseError("No choices in response".to_string()))?;

        Ok(ChatResponse {
            content,
            model: if parsed.model.is_empty() {
                self.model.clone()
            } else {
                parsed.model
            },
            tokens_used: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        Ok(self.api_key.is_some())
    }
}

// --- Anthropic backend ---

#[cfg(feature = "remote-ai")]
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

#[cfg(feature = "remote-ai")]
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[cfg(feature = "remote-ai")]
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[cfg(feature = "remote-ai")]
#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[cfg(feature = "remote-ai")]
#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic API backend implementation.
#[cfg(feature = "remote-ai")]
pub struct AnthropicBackend {
    client: reqwest::Client,
    model: String,
    api_key: String,
}

#[cfg(feature = "remote-ai")]
impl AnthropicBackend {
    pub fn new(api_key: String, model: String, timeout_seconds: u64) -> Result<Self, AgentError> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            model,
            api_key,
        })
    }
}

#[cfg(feature = "remote-ai")]
#[async_trait]
impl AiBackend for AnthropicBackend {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AgentError> {
        // System messages go in the top-level system field
        let mut system_parts: Vec<String> = Vec::new();
        let mut messages: Vec<WireMessage> = Vec::new();

        for msg in request.messages {
            match msg.role {
                MessageRole::System => system_parts.push(msg.content),
                _ => messages.push(msg.into()),
            }
        }

        if request.json_mode {
            system_parts.push(
                "IMPORTANT: You must respond with valid JSON only. No other text.".to_string(),
            );
        }

        let anthropic_request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(4096),
            messages,
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
            temperature: request.temperature,
        };

        debug!("Sending request to Anthropic API");

        let builder = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let parsed: AnthropicResponse = send_json("Anthropic", builder, &anthropic_request).await?;

        let content = parsed
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<String>();

        Ok(ChatResponse {
            content,
            model: parsed.model,
            tokens_used: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
        })
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        // Anthropic has no health endpoint; assume available if key is set
        Ok(true)
    }
}

/// Create an AI backend from configuration.
pub fn create_backend(config: &AiBackendConfig) -> Result<Arc<dyn AiBackend>, AgentError> {
    match config {
        AiBackendConfig::Ollama {
            base_url,
            model,
            timeout_seconds,
        } => Ok(Arc::new(OllamaBackend::new(
            base_url.clone(),
            model.clone(),
            *timeout_seconds,
        )?)),
        AiBackendConfig::Runner {
            base_url,
            api_key_env,
            model,
            timeout_seconds,
        } => {
            let api_key = std::env::var(api_key_env).ok().filter(|k| !k.is_empty());
            if api_key.is_none() {
                warn!(
                    "{} not set, agent runner calls will fall back to defaults",
                    api_key_env
                );
            }
            Ok(Arc::new(RunnerBackend::new(
                base_url.clone(),
                model.clone(),
                api_key,
                *timeout_seconds,
            )?))
        }
        #[cfg(feature = "remote-ai")]
        AiBackendConfig::Anthropic {
            api_key_env,
            model,
            timeout_seconds,
        } => {
            let api_key = std::env::var(api_key_env).map_err(|_| {
                AgentError::BackendUnavailable(format!("{} env var not set", api_key_env))
            })?;
            Ok(Arc::new(AnthropicBackend::new(
                api_key,
                model.clone(),
                *timeout_seconds,
            )?))
        }
    }
}

/// Mock backend for testing. Records every request it receives.
#[cfg(test)]
pub struct MockBackend {
    response: String,
    pub requests: std::sync::Mutex<Vec<ChatRequest>>,
}

#[cfg(test)]
impl MockBackend {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl AiBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AgentError> {
        self.requests.lock().unwrap().push(request);
        Ok(ChatResponse {
            content: self.response.clone(),
            model: "mock".to_string(),
            tokens_used: None,
        })
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        Ok(true)
    }
}

/// Backend that always fails, or hangs past any timeout.
#[cfg(test)]
pub enum FailingBackend {
    Unavailable,
    Hang,
}

#[cfg(test)]
#[async_trait]
impl AiBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, AgentError> {
        match self {
            FailingBackend::Unavailable => Err(AgentError::BackendUnavailable(
                "connection refused".to_string(),
            )),
            FailingBackend::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AgentError::Timeout(3600))
            }
        }
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        Ok(false)
    }
}
