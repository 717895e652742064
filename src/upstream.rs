//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ServiceError;
use crate::repair::{CompletionRequest, GenerationService};

const FENCE: &str = "```";
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<Value>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

/// Builds the `[system, user]` message list. An attached image turns the user content into a
/// text part followed by an `image_url` part.
pub fn build_messages(system: &str, user_prompt: &str, image_data_url: Option<&str>) -> Vec<Value> {
    let user = match image_data_url.filter(|url| !url.is_empty()) {
        Some(url) => json!({
            "role": "user",
            "content": [
                {"type": "text", "text": user_prompt},
                {"type": "image_url", "image_url": {"url": url}},
            ],
        }),
        None => json!({"role": "user", "content": user_prompt}),
    };
    vec![json!({"role": "system", "content": system}), user]
}

/// Trims the assistant text and removes one outer fence, dropping a `markdown`/`md` label.
///
/// Fences with any other label are kept intact for the extractor.
pub fn normalize_content(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed.to_owned();
    }
    let parts: Vec<&str> = trimmed.split(FENCE).collect();
    if parts.len() < 3 {
        return trimmed.to_owned();
    }

    let inner = parts[1..parts.len() - 1].join(FENCE);
    let inner = inner.trim();
    let inner = ["markdown\n", "md\n"]
        .iter()
        .find_map(|label| inner.strip_prefix(label))
        .unwrap_or(inner);
    inner.trim().to_owned()
}

/// HTTP client for a chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl UpstreamClient {
    /// `timeout` bounds every single HTTP request.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(timeout)
            .build()
            .map_err(|err| ServiceError::Network(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn content_of(value: &Value) -> Option<&str> {
    value.pointer("/choices/0/message/content")?.as_str()
}

#[async_trait]
impl GenerationService for UpstreamClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError> {
        if self.api_key.trim().is_empty() {
            return Err(ServiceError::MissingApiKey);
        }

        let body = ChatBody {
            model: &request.model,
            messages: build_messages(
                &request.system,
                &request.user_prompt,
                request.image_data_url.as_deref(),
            ),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };
        log::debug!(
            "POST {} (model {}, temperature {}, max_tokens {})",
            self.endpoint,
            request.model,
            request.temperature,
            request.max_tokens
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ServiceError::TimedOut
                } else {
                    ServiceError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|err| ServiceError::MalformedResponse(format!("body is not JSON: {err}")))?;
        let content = content_of(&value).ok_or_else(|| {
            ServiceError::MalformedResponse("missing choices[0].message.content".to_owned())
        })?;
        Ok(normalize_content(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_only_messages() {
        let messages = build_messages("S", "P", None);
        assert_eq!(messages[0], json!({"role": "system", "content": "S"}));
        assert_eq!(messages[1], json!({"role": "user", "content": "P"}));
    }

    #[test]
    fn image_becomes_content_parts() {
        let messages = build_messages("S", "P", Some("data:image/jpeg;base64,xxx"));
        assert_eq!(messages[1]["role"], "user");
        let parts = messages[1]["content"].as_array().unwrap();
        assert_eq!(parts[0], json!({"type": "text", "text": "P"}));
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,xxx");
    }

    #[test]
    fn strips_markdown_fence_only() {
        assert_eq!(normalize_content("  ```markdown\n# 标题\n```  "), "# 标题");
        assert_eq!(normalize_content("```md\ntext\n```"), "text");
        assert_eq!(normalize_content("```json\n{}\n```"), "json\n{}");
        assert_eq!(normalize_content("```\n{}"), "```\n{}");
        assert_eq!(normalize_content(" {} "), "{}");
    }

    #[test]
    fn reads_first_choice() {
        let value = json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(content_of(&value), Some("hi"));
        assert_eq!(content_of(&json!({"choices": []})), None);
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let endpoint = "http://127.0.0.1:9/v1/chat/completions";
        let client = UpstreamClient::new(endpoint, " ", Duration::from_secs(1)).unwrap();
        let err = client
            .complete(CompletionRequest::new("m", "s", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingApiKey));
    }
}
