use async_trait::async_trait;
use jurist_core::{
    agent::{Completion, CompletionProvider, CompletionRequest},
    error::ProviderError,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const JSON_ONLY: &str = "\n\nRespond with a single JSON object and nothing else.";

/// Completion provider backed by the Anthropic Messages API.
pub struct AnthropicBackend {
    pub model: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: MESSAGES_URL.to_string(),
            http: crate::http::client("jurist/0.1"),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        let mut system = request.system.clone();
        if request.json_output {
            system.push_str(JSON_ONLY);
        }
        json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "system": system,
            "messages": [{"role": "user", "content": request.prompt}],
        })
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl From<MessagesResponse> for Completion {
    fn from(r: MessagesResponse) -> Self {
        let text = r
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        Completion {
            text,
            tokens_used: r.usage.input_tokens + r.usage.output_tokens,
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("ANTHROPIC_API_KEY is not set".into()));
        }
        info!(purpose = request.purpose.as_str(), model = %self.model, "calling anthropic messages API");

        let req = self
            .http
            .post(&self.base_url)
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(&request));
        let parsed: MessagesResponse = crate::http::send_json(req)
            .await
            .inspect_err(|e| warn!(purpose = request.purpose.as_str(), "anthropic request failed: {e}"))?;

        let completion = Completion::from(parsed);
        info!(
            purpose = request.purpose.as_str(),
            output_len = completion.text.len(),
            tokens = completion.tokens_used,
            "anthropic response received"
        );
        Ok(completion)
    }
}
