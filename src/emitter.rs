// Emit client — the caller side of POST /emit.
//
// Whatever decides a post deserves a label (a classifier, a moderator tool)
// uses this to hand the decision to the relay. It sends the shared key as a
// bearer token and surfaces the relay's error message on refusal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::authority::{LabelAssertion, LabelAuthority};
use crate::web::handlers::emit::EmitRequest;

/// Default relay address for a relay running on the same host.
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

/// Error body returned by the relay for every refused request.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for a relay's admission endpoint.
pub struct EmitClient {
    client: reqwest::Client,
    relay_url: String,
    emit_label_key: String,
}

impl EmitClient {
    pub fn new(relay_url: &str, emit_label_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("labelrelay/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            relay_url: relay_url.trim_end_matches('/').to_string(),
            emit_label_key: emit_label_key.to_string(),
        })
    }

    /// Ask the relay to apply `label` to `uri`.
    pub async fn emit(&self, uri: &str, label: &str) -> Result<()> {
        let url = format!("{}/emit", self.relay_url);
        let body = EmitRequest {
            uri: Some(uri.to_string()),
            label: Some(label.to_string()),
        };

        debug!(uri = uri, label = label, "Sending label to relay");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.emit_label_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Emit request failed: {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            anyhow::bail!("Relay returned {status}: {message}");
        }

        Ok(())
    }
}

/// Seen from a classifier, the relay is just another label authority.
#[async_trait]
impl LabelAuthority for EmitClient {
    async fn create_label(&self, assertion: &LabelAssertion) -> Result<()> {
        self.emit(&assertion.uri, &assertion.label).await
    }
}
