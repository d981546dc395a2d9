use async_trait::async_trait;
use jurist_core::{
    agent::{RawSearchHit, SearchOptions, SearchProvider},
    error::ProviderError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SEARCH_URL: &str = "https://api.exa.ai/search";

/// Web search via the Exa API, returning page text with each hit.
pub struct ExaSearch {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl ExaSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: SEARCH_URL.to_string(),
            http: crate::http::client("jurist/0.1"),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    num_results: usize,
    #[serde(rename = "type")]
    search_type: &'a str,
    contents: ExaContents,
}

#[derive(Serialize)]
struct ExaContents {
    text: ExaText,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaText {
    max_characters: usize,
}

#[derive(Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<RawSearchHit>,
}

fn request_body<'a>(query: &'a str, options: &'a SearchOptions) -> ExaRequest<'a> {
    ExaRequest {
        query,
        num_results: options.num_results,
        search_type: &options.search_type,
        contents: ExaContents { text: ExaText { max_characters: options.max_content_chars } },
    }
}

#[async_trait]
impl SearchProvider for ExaSearch {
    fn name(&self) -> &str {
        "exa"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawSearchHit>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("EXA_API_KEY is not set".into()));
        }
        debug!(query, num_results = options.num_results, "calling exa search");
        let req = self
            .http
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .json(&request_body(query, options));
        let parsed: ExaResponse = crate::http::send_json(req)
            .await
            .inspect_err(|e| warn!(query, "exa search failed: {e}"))?;
        Ok(parsed.results)
    }
}
