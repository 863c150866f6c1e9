//! Language-model backends for skill categorization.
//!
//! Defines the [`ChatBackend`] trait and concrete implementations:
//! - [`DisabledBackend`]: always fails; used when no provider is configured.
//! - [`BedrockBackend`]: AWS Bedrock runtime `InvokeModel`, SigV4-signed.
//! - [`AnthropicBackend`]: the Anthropic Messages API.
//!
//! A backend answers one request for one model id. Choosing among several
//! model ids is the caller's job (see [`crate::categorize`]), which lets a
//! rejected model fall through to the next one in the chain.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use job_atlas::config::LlmConfig;
//! # use job_atlas::llm::create_backend;
//! let config = LlmConfig::default(); // provider = "disabled"
//! let backend = create_backend(&config).unwrap();
//! assert_eq!(backend.name(), "disabled");
//! ```
//!
//! # Failure Model
//!
//! Any non-2xx status, transport error, or response without a text block is
//! an `Err`. There is no retry here; the fallback chain and the pacing
//! between batches are the only recovery.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::aws::{uri_encode, AwsCredentials, SigV4};
use crate::config::LlmConfig;

/// Messages API version sent to the Anthropic API.
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// One user or assistant turn.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// A single-turn request in the Anthropic message format.
///
/// Serializes directly to the Bedrock `InvokeModel` body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub anthropic_version: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn user(config: &LlmConfig, system: &str, prompt: String) -> Self {
        Self {
            anthropic_version: config.anthropic_version.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system: system.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        }
    }
}

/// A language-model endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider identifier (e.g. `"bedrock"`).
    fn name(&self) -> &str;

    /// Send `request` to `model_id` and return the response text.
    async fn invoke(&self, model_id: &str, request: &ChatRequest) -> Result<String>;
}

// ============ Disabled Backend ============

/// Fails every call. Used when `llm.provider = "disabled"`.
pub struct DisabledBackend;

#[async_trait]
impl ChatBackend for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn invoke(&self, _model_id: &str, _request: &ChatRequest) -> Result<String> {
        bail!("LLM provider is disabled")
    }
}

// ============ Bedrock Backend ============

/// AWS Bedrock runtime.
///
/// Calls `POST /model/{modelId}/invoke` on
/// `bedrock-runtime.{region}.amazonaws.com` (or `llm.endpoint_url`).
/// Credentials come from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
/// `AWS_SESSION_TOKEN`.
pub struct BedrockBackend {
    client: reqwest::Client,
    credentials: AwsCredentials,
    region: String,
    endpoint: Url,
}

impl BedrockBackend {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_credentials(config, AwsCredentials::from_env()?)
    }

    pub fn with_credentials(config: &LlmConfig, credentials: AwsCredentials) -> Result<Self> {
        let region = config.region();
        let endpoint = match config.endpoint_url {
            Some(ref u) => u.clone(),
            None => format!("https://bedrock-runtime.{region}.amazonaws.com"),
        };
        Ok(Self {
            client: http_client(config)?,
            credentials,
            region,
            endpoint: Url::parse(&endpoint)
                .with_context(|| format!("invalid Bedrock endpoint: {endpoint}"))?,
        })
    }
}

#[async_trait]
impl ChatBackend for BedrockBackend {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn invoke(&self, model_id: &str, request: &ChatRequest) -> Result<String> {
        let body = serde_json::to_vec(request)?;
        let path = format!("/model/{}/invoke", uri_encode(model_id));
        let host = endpoint_host(&self.endpoint)?;
        let url = format!("{}://{}{}", self.endpoint.scheme(), host, path);

        let signer = SigV4 {
            credentials: &self.credentials,
            region: &self.region,
            service: "bedrock",
        };
        let signed = signer.sign(
            "POST",
            &host,
            &path,
            &[("content-type", "application/json")],
            &body,
            chrono::Utc::now(),
        );

        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "application/json");
        for (name, value) in signed {
            req = req.header(name, value);
        }

        let response = req
            .body(body)
            .send()
            .await
            .with_context(|| format!("Bedrock request to {model_id} failed"))?;
        read_message_response(response, model_id).await
    }
}

// ============ Anthropic Backend ============

/// The Anthropic Messages API, keyed by `ANTHROPIC_API_KEY`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl AnthropicBackend {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            api_key: api_key.into(),
            endpoint: config
                .endpoint_url
                .clone()
                .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
        })
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn invoke(&self, model_id: &str, request: &ChatRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": model_id,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": request.messages,
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.endpoint.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Anthropic request to {model_id} failed"))?;
        read_message_response(response, model_id).await
    }
}

fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// `host[:port]` as it must appear in the signed `host` header.
fn endpoint_host(endpoint: &Url) -> Result<String> {
    let host = endpoint
        .host_str()
        .ok_or_else(|| anyhow!("endpoint has no host: {endpoint}"))?;
    Ok(match endpoint.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

async fn read_message_response(response: reqwest::Response, model_id: &str) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!(
            "model {} rejected request (HTTP {}): {}",
            model_id,
            status,
            body.chars().take(500).collect::<String>()
        );
    }
    let json: serde_json::Value = response.json().await?;
    message_text(&json)
}

/// Extract the first text block from a Messages-format response.
pub fn message_text(json: &serde_json::Value) -> Result<String> {
    json.get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| {
            blocks
                .iter()
                .find_map(|b| b.get("text").and_then(|t| t.as_str()))
        })
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid model response: no text content"))
}

/// Create the [`ChatBackend`] named by `llm.provider`.
///
/// | Config Value | Backend |
/// |-------------|---------|
/// | `"disabled"` | [`DisabledBackend`] |
/// | `"bedrock"` | [`BedrockBackend`] |
/// | `"anthropic"` | [`AnthropicBackend`] |
pub fn create_backend(config: &LlmConfig) -> Result<Box<dyn ChatBackend>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledBackend)),
        "bedrock" => Ok(Box::new(BedrockBackend::new(config)?)),
        "anthropic" => Ok(Box::new(AnthropicBackend::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}
