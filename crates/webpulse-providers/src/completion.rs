use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use webpulse_models::LlmConfig;

use crate::client::UpstreamClient;
use crate::error::UpstreamError;

/// Free-text completion backend. Mockable for testing.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Build the completer when an API key is configured.
pub fn text_completer(client: &UpstreamClient, config: &LlmConfig) -> Option<Arc<dyn TextCompleter>> {
    let key = config.openai_api_key.clone().filter(|k| !k.is_empty())?;
    Some(Arc::new(OpenAiCompleter::new(client, config, key)))
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiCompleter {
    client: UpstreamClient,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    system_prompt: String,
}

impl OpenAiCompleter {
    pub fn new(client: &UpstreamClient, config: &LlmConfig, api_key: String) -> Self {
        Self {
            client: client.with_timeout(Duration::from_secs(config.timeout_seconds)),
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_prompt},
                {"role": "user", "content": prompt},
            ],
            "temperature": self.temperature,
        })
    }
}

#[async_trait]
impl TextCompleter for OpenAiCompleter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let auth = format!("Bearer {}", self.api_key);
        let body: Value = self
            .client
            .post_json(
                "openai",
                &self.url,
                &[("Authorization", auth.as_str())],
                &self.request_body(prompt),
            )
            .await?;
        parse_completion(&body)
    }
}

/// `{"choices": [{"message": {"content": "..."}}]}`
pub fn parse_completion(body: &Value) -> Result<String, UpstreamError> {
    body.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| UpstreamError::Decode("openai: no choices[0].message.content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_of_first_choice() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "  Hello there.\n"}}]
        });
        assert_eq!(parse_completion(&body).unwrap(), "Hello there.");
    }

    #[test]
    fn missing_choices_is_decode_error() {
        let body = json!({"error": {"message": "rate limited"}});
        assert!(matches!(
            parse_completion(&body),
            Err(UpstreamError::Decode(_))
        ));
    }

    #[test]
    fn completer_requires_key() {
        let client = UpstreamClient::new(&Default::default()).unwrap();
        let mut config = LlmConfig::default();
        assert!(text_completer(&client, &config).is_none());

        config.openai_api_key = Some("sk-test".to_string());
        let completer = text_completer(&client, &config).unwrap();
        assert_eq!(completer.model(), "gpt-4o-mini");
    }

    #[test]
    fn request_carries_system_prompt_and_temperature() {
        let client = UpstreamClient::new(&Default::default()).unwrap();
        let config = LlmConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..LlmConfig::default()
        };
        let completer = OpenAiCompleter::new(&client, &config, "sk".to_string());
        assert_eq!(completer.url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(completer.client.timeout(), Duration::from_secs(60));

        let body = completer.request_body("hi");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }
}
