// HTTP client for the label authority's label creation API.
//
// The labeler owns the signing identity; this client only tells it which
// subject to label and with what value. One POST per assertion, no retries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use super::traits::{LabelAssertion, LabelAuthority};

/// Path of the label creation endpoint on the labeler.
///
/// This route belongs to this relay's contract, not to any stock labeler
/// server; whatever runs as the label authority has to serve it.
pub const CREATE_LABEL_PATH: &str = "/create-label";

/// Body sent to the labeler for each assertion.
#[derive(Debug, Serialize)]
pub struct CreateLabelRequest<'a> {
    pub uri: &'a str,
    pub val: &'a str,
    /// Creation timestamp, RFC 3339 with millisecond precision.
    pub cts: String,
}

impl<'a> CreateLabelRequest<'a> {
    pub fn new(assertion: &'a LabelAssertion) -> Self {
        Self {
            uri: &assertion.uri,
            val: &assertion.label,
            cts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Label authority reached over HTTP.
pub struct HttpLabelAuthority {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLabelAuthority {
    /// Create a client pointing at the labeler's base URL
    /// (e.g. `http://127.0.0.1:14831`).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("labelrelay/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, CREATE_LABEL_PATH)
    }
}

#[async_trait]
impl LabelAuthority for HttpLabelAuthority {
    async fn create_label(&self, assertion: &LabelAssertion) -> Result<()> {
        let url = self.endpoint();
        let request = CreateLabelRequest::new(assertion);

        debug!(uri = %assertion.uri, label = %assertion.label, "Creating label");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Label authority request failed: {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Label authority returned {status}: {body}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        let authority = HttpLabelAuthority::new("http://127.0.0.1:14831/").unwrap();
        assert_eq!(authority.endpoint(), "http://127.0.0.1:14831/create-label");
    }

    #[test]
    fn request_body_uses_labeler_field_names() {
        let assertion = LabelAssertion {
            uri: "at://did:plc:abc/app.bsky.feed.post/3k1".to_string(),
            label: "funny".to_string(),
        };
        let json = serde_json::to_value(CreateLabelRequest::new(&assertion)).unwrap();
        assert_eq!(json["uri"], "at://did:plc:abc/app.bsky.feed.post/3k1");
        assert_eq!(json["val"], "funny");
        let cts = json["cts"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(cts).is_ok());
        assert!(cts.ends_with('Z'));
    }

    #[test]
    fn env_example_documents_create_label_route() {
        let example = include_str!("../../.env.example");
        assert!(example.contains(&format!("POST {CREATE_LABEL_PATH}")));
        assert!(example.contains("\"cts\""));
    }
}
