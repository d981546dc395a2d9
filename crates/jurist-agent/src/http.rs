use jurist_core::error::ProviderError;
use serde::de::DeserializeOwned;

pub(crate) fn client(user_agent: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .unwrap_or_default()
}

/// Send a prepared request and decode a JSON body. Non-2xx responses keep
/// their status and body so callers can log them.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Request(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status { status: status.as_u16(), body: truncate(&body, 500) });
    }
    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::Request(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
