use async_trait::async_trait;
use jurist_core::{
    agent::{Completion, CompletionProvider, CompletionRequest},
    error::ProviderError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Calls a locally-hosted Ollama model via its native chat API.
///
/// For deployments where case material must not leave the local machine.
/// Structured-output requests use Ollama's `format: "json"` mode.
pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    http: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            http: crate::http::client("jurist/0.1"),
        }
    }

    fn chat_request(&self, request: &CompletionRequest) -> OllamaChatRequest {
        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(OllamaMessage {
                role: "system".into(),
                content: request.system.clone(),
            });
        }
        messages.push(OllamaMessage {
            role: "user".into(),
            content: request.prompt.clone(),
        });
        OllamaChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            format: request.json_output.then(|| "json".to_string()),
            options: OllamaOptions { num_predict: request.max_tokens },
        }
    }
}

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

impl From<OllamaChatResponse> for Completion {
    fn from(r: OllamaChatResponse) -> Self {
        Completion {
            text: r.message.content,
            tokens_used: r.prompt_eval_count + r.eval_count,
        }
    }
}

#[async_trait]
impl CompletionProvider for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let body = self.chat_request(&request);
        info!(
            purpose = request.purpose.as_str(),
            model = %self.model,
            base_url = %self.base_url,
            "calling ollama chat API"
        );

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let parsed: OllamaChatResponse = crate::http::send_json(self.http.post(&url).json(&body))
            .await
            .inspect_err(|e| warn!(purpose = request.purpose.as_str(), "ollama request failed: {e}"))?;

        let completion = Completion::from(parsed);
        info!(
            purpose = request.purpose.as_str(),
            output_len = completion.text.len(),
            tokens = completion.tokens_used,
            "ollama response received"
        );
        Ok(completion)
    }
}
