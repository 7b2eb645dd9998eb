use crate::config::{env, env_any, env_u64};
use docxmart_core::{ChatBackend, Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.ai71.ai";
pub const DEFAULT_MODEL: &str = "tiiuae/falcon-180b-chat";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

pub fn api_key_from_env() -> Option<String> {
    env_any(&["DOCXMART_API_KEY", "AI71_API_KEY"])
}

pub fn base_url_from_env() -> String {
    env("DOCXMART_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

pub fn model_from_env() -> String {
    env("DOCXMART_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

pub fn timeout_ms_from_env() -> u64 {
    env_u64("DOCXMART_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)
}

/// The single user message sent for a prompt about a document.
pub fn compose_user_message(context_text: &str, prompt: &str) -> String {
    format!("Here's a document: {context_text} \n\n---\n\n {prompt}")
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_ms: u64,
}

impl OpenAiCompatClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            timeout_ms: timeout_ms.max(1),
        }
    }

    /// Build from `DOCXMART_*` env vars. An API key is required unless the base URL was
    /// overridden (local gateways often run without one).
    pub fn from_env(client: reqwest::Client, model_override: Option<String>) -> Result<Self> {
        let base_url = base_url_from_env();
        let api_key = api_key_from_env();
        if api_key.is_none() && base_url == DEFAULT_BASE_URL {
            return Err(Error::NotConfigured(
                "missing DOCXMART_API_KEY (or AI71_API_KEY)".to_string(),
            ));
        }
        let model = model_override
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(model_from_env);
        Ok(Self::new(
            client,
            base_url,
            api_key,
            model,
            timeout_ms_from_env(),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_chat_completions(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    pub async fn chat(&self, messages: Vec<Message>) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages,
            stream: Some(false),
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb.json(&req).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Chat(format!("timed out after {}ms", self.timeout_ms))
            } else {
                Error::Chat(e.to_string())
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Chat(format!("chat.completions HTTP {status}")));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Chat(e.to_string()))?;
        Ok(parsed.first_content())
    }
}

#[async_trait::async_trait]
impl ChatBackend for OpenAiCompatClient {
    fn name(&self) -> &'static str {
        "openai_compat"
    }

    async fn complete(&self, context_text: &str, prompt: &str) -> Result<String> {
        self.chat(vec![Message {
            role: "user".to_string(),
            content: compose_user_message(context_text, prompt),
        }])
        .await
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatCompletionsResponse {
    /// Missing choices, message, or content all read as an empty reply.
    fn first_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> String {
        serde_json::from_str::<ChatCompletionsResponse>(raw)
            .unwrap()
            .first_content()
    }

    #[test]
    fn response_without_choices_is_empty_not_an_error() {
        assert_eq!(parse(r#"{}"#), "");
        assert_eq!(parse(r#"{"choices":[]}"#), "");
        assert_eq!(parse(r#"{"choices":[{}]}"#), "");
        assert_eq!(parse(r#"{"choices":[{"message":{"role":"assistant"}}]}"#), "");
        assert_eq!(parse(r#"{"choices":[{"message":{"content":null}}]}"#), "");
    }

    #[test]
    fn response_takes_first_choice_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"a"}},{"message":{"content":"b"}}]}"#;
        assert_eq!(parse(raw), "a");
    }

    #[test]
    fn user_message_embeds_context_then_prompt() {
        let m = compose_user_message("DOC", "Summarize this");
        assert_eq!(m, "Here's a document: DOC \n\n---\n\n Summarize this");
    }

    #[test]
    fn endpoint_does_not_double_the_version_segment() {
        let c = |base: &str| {
            OpenAiCompatClient::new(reqwest::Client::new(), base, None, "m", 1000)
                .endpoint_chat_completions()
        };
        assert_eq!(c("http://x"), "http://x/v1/chat/completions");
        assert_eq!(c("http://x/"), "http://x/v1/chat/completions");
        assert_eq!(c("https://api.ai71.ai/v1/"), "https://api.ai71.ai/v1/chat/completions");
    }
}
