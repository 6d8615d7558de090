// Chat completions classifier (LM Studio or any OpenAI-compatible server).
//
// The model sees the parent post and the reply as two user messages and must
// answer with {"bad_faith": bool, "off_topic": bool, "funny": bool}. The
// request pins that shape with a strict JSON schema, but some models still
// wrap the answer in a ```json fence, so the fence is stripped before parsing.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::traits::{Classification, ReplyClassifier};
use crate::config::{ApiKeyType, ClassifierConfig};

/// Default chat completions path, overridable with LMSTUDIO_ENDPOINT.
pub const DEFAULT_CHAT_ENDPOINT: &str = "/v1/chat/completions";

/// Per-request timeout for the model call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You are an observer of posts on a microblogging website. \
You determine if the second message provided by the user is a bad faith reply, an off topic \
reply, and/or a funny reply to the first message provided to you. Opposing viewpoints are good, \
and should be appreciated. However, things that are toxic, trollish, or offer no good value to \
the conversation are considered bad faith. Just because something is bad faith or off topic does \
not mean the post cannot also be funny. Always respond with pure JSON. The structure should be \
{bad_faith: boolean, off_topic: boolean, funny: boolean}. Never include additional context about \
why you made a choice, only the raw JSON.";

/// Classifier backed by a chat completions API.
pub struct ChatClassifier {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<(ApiKeyType, String)>,
}

impl ChatClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("labelrelay/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let endpoint = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_CHAT_ENDPOINT);

        Ok(Self {
            client,
            url: format!("{}{}", config.host.trim_end_matches('/'), endpoint),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReplyClassifier for ChatClassifier {
    async fn classify(&self, parent: &str, reply: &str) -> Result<Classification> {
        let request = ChatRequest::classification(&self.model, parent, reply);

        let mut builder = self.client.post(&self.url).json(&request);
        builder = match &self.api_key {
            Some((ApiKeyType::Bearer, key)) => builder.bearer_auth(key),
            Some((ApiKeyType::XApiKey, key)) => builder.header("x-api-key", key),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .context("Failed to call chat completions API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completions API returned {}: {}", status, body);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completions response")?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .context("Chat completions response had no choices")?;

        debug!(
            model = %self.model,
            reply_preview = %reply.chars().take(50).collect::<String>(),
            "Classified reply"
        );

        parse_classification(content)
    }
}

/// Strip an optional ```json fence from a model answer.
pub fn strip_json_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("```json") {
        Some(inner) => inner.trim_end().trim_end_matches("```").trim(),
        None => trimmed,
    }
}

/// Parse the model's answer. Every flag must be present and boolean.
pub fn parse_classification(raw: &str) -> Result<Classification> {
    let value: Value = serde_json::from_str(strip_json_fence(raw))
        .with_context(|| format!("Failed to parse model answer: {raw}"))?;

    let flag = |name: &str| -> Result<bool> {
        match value.get(name).and_then(Value::as_bool) {
            Some(b) => Ok(b),
            None => anyhow::bail!("Model gave a bad answer ({name} missing or not a boolean)"),
        }
    };

    Ok(Classification {
        bad_faith: flag("bad_faith")?,
        off_topic: flag("off_topic")?,
        funny: flag("funny")?,
    })
}

// --- Chat completions request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
    response_format: Value,
}

impl<'a> ChatRequest<'a> {
    fn classification(model: &'a str, parent: &'a str, reply: &'a str) -> Self {
        Self {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: parent,
                },
                Message {
                    role: "user",
                    content: reply,
                },
            ],
            temperature: 0.7,
            max_tokens: 100,
            response_format: response_format(),
        }
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

fn response_format() -> Value {
    let flag = |description: &str| {
        serde_json::json!({ "type": "boolean", "description": description })
    };
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "message_classification",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "bad_faith": flag("Whether the reply to the parent is bad faith or not."),
                    "off_topic": flag("Whether the reply to the parent is off topic."),
                    "funny": flag("Whether the reply to the parent is funny."),
                },
                "required": ["bad_faith", "off_topic", "funny"],
            }
        }
    })
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_is_parsed() {
        let c = parse_classification(r#"{"bad_faith": true, "off_topic": false, "funny": true}"#)
            .unwrap();
        assert_eq!(
            c,
            Classification {
                bad_faith: true,
                off_topic: false,
                funny: true,
            }
        );
    }

    #[test]
    fn json_fence_is_stripped() {
        let raw = "```json\n{\"bad_faith\": false, \"off_topic\": true, \"funny\": false}\n```";
        assert_eq!(
            strip_json_fence(raw),
            "{\"bad_faith\": false, \"off_topic\": true, \"funny\": false}"
        );
        let c = parse_classification(raw).unwrap();
        assert!(c.off_topic);
        assert!(!c.bad_faith);
    }

    #[test]
    fn unfenced_text_is_left_alone() {
        assert_eq!(strip_json_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn missing_flag_is_rejected() {
        let err = parse_classification(r#"{"bad_faith": true, "funny": false}"#).unwrap_err();
        assert!(err.to_string().contains("off_topic"), "{err}");
    }

    #[test]
    fn non_boolean_flag_is_rejected() {
        let err =
            parse_classification(r#"{"bad_faith": "yes", "off_topic": false, "funny": false}"#)
                .unwrap_err();
        assert!(err.to_string().contains("bad_faith"), "{err}");
    }

    #[test]
    fn prose_answer_is_rejected() {
        assert!(parse_classification("This reply seems fine to me.").is_err());
    }

    #[test]
    fn request_carries_strict_schema_and_both_posts() {
        let request = ChatRequest::classification("local-model", "parent text", "reply text");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "local-model");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "parent text");
        assert_eq!(json["messages"][2]["content"], "reply text");
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
        assert_eq!(
            json["response_format"]["json_schema"]["schema"]["required"],
            serde_json::json!(["bad_faith", "off_topic", "funny"])
        );
    }

    #[test]
    fn endpoint_override_replaces_default_path() {
        let mut config = ClassifierConfig {
            host: "http://localhost:1234/".to_string(),
            endpoint: None,
            model: "m".to_string(),
            api_key: None,
        };
        assert_eq!(
            ChatClassifier::new(&config).unwrap().url(),
            "http://localhost:1234/v1/chat/completions"
        );
        config.endpoint = Some("/api/chat".to_string());
        assert_eq!(
            ChatClassifier::new(&config).unwrap().url(),
            "http://localhost:1234/api/chat"
        );
    }
}
