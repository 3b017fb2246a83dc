use std::time::Duration;

use async_trait::async_trait;
use parley_core::{ChatMessage, LLMProvider, LLMResponse, Usage};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Each call is a single request. Failures are returned to the caller
/// as-is; nothing is retried.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAiProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Bound every request by `timeout`. Without it a request may wait
    /// indefinitely on the remote side.
    pub fn with_timeout(mut self, timeout: Duration) -> anyhow::Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Model identifiers visible to this API key, sorted.
    pub async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let mut models: Vec<String> = response["data"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing data"))?
            .iter()
            .filter_map(|model| model["id"].as_str().map(str::to_string))
            .collect();
        models.sort();
        Ok(models)
    }
}

/// Pull the reply text and token usage out of a completion response body.
pub(crate) fn parse_completion(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))?
        .to_string();

    let usage = response["usage"].as_object().map(|u| Usage {
        prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
            .unwrap_or(0),
        total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
    });

    Ok(LLMResponse { content, usage })
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
    ) -> anyhow::Result<LLMResponse> {
        let request = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "n": 1,
        });

        info!(
            "Sending request to chat API: model={model}, messages={}",
            messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let parsed = parse_completion(&response)?;
        debug!("Received {} chars from chat API", parsed.content.len());
        Ok(parsed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_and_usage() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi there"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        });

        let parsed = parse_completion(&body).unwrap();
        assert_eq!(parsed.content, "Hi there");
        assert_eq!(
            parsed.usage,
            Some(Usage {
                prompt_tokens: 12,
                completion_tokens: 3,
                total_tokens: 15,
            })
        );
    }

    #[test]
    fn usage_is_optional() {
        let body = json!({"choices": [{"message": {"content": "ok"}}]});
        let parsed = parse_completion(&body).unwrap();
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn missing_content_is_an_error() {
        let body = json!({"error": {"message": "quota exceeded"}});
        assert!(parse_completion(&body).is_err());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider =
            OpenAiProvider::new("key".to_string()).with_base_url("http://localhost:8080/v1/".into());
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }
}
