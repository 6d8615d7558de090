// Reply pipeline — classify one reply and emit the labels it earned.
//
// Only replies in threads started by a watched account are classified, and
// replies with no text are skipped without calling the model. Each label the
// classifier returns becomes one emit call.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::traits::ReplyClassifier;
use crate::authority::{LabelAssertion, LabelAuthority};

/// A reply and the post it answers.
#[derive(Debug, Clone)]
pub struct Reply {
    /// AT-URI of the reply itself; this is what gets labeled.
    pub uri: String,
    /// AT-URI of the parent post, when known.
    pub parent_uri: Option<String>,
    pub parent_text: String,
    pub text: String,
}

/// What the pipeline did with a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Parent author is not watched.
    NotWatched,
    /// Reply has no text to judge.
    NoText,
    /// Classified; these labels were emitted (possibly none).
    Labeled(Vec<&'static str>),
}

/// Extract the authority (DID or handle) from an `at://` URI.
pub fn at_uri_authority(uri: &str) -> Result<&str> {
    let Some(rest) = uri.strip_prefix("at://") else {
        anyhow::bail!("not an at:// URI: {uri}");
    };
    match rest.split('/').next() {
        Some(authority) if !authority.is_empty() => Ok(authority),
        _ => anyhow::bail!("at:// URI has no authority: {uri}"),
    }
}

pub struct ReplyPipeline {
    classifier: Arc<dyn ReplyClassifier>,
    emitter: Arc<dyn LabelAuthority>,
    /// `None` watches every thread.
    watched: Option<HashSet<String>>,
}

impl ReplyPipeline {
    pub fn new(
        classifier: Arc<dyn ReplyClassifier>,
        emitter: Arc<dyn LabelAuthority>,
        watched: Option<HashSet<String>>,
    ) -> Self {
        Self {
            classifier,
            emitter,
            watched,
        }
    }

    fn is_watched(&self, reply: &Reply) -> Result<bool> {
        let (Some(watched), Some(parent_uri)) = (&self.watched, &reply.parent_uri) else {
            return Ok(true);
        };
        Ok(watched.contains(at_uri_authority(parent_uri)?))
    }

    pub async fn process(&self, reply: &Reply) -> Result<Outcome> {
        if !self.is_watched(reply)? {
            return Ok(Outcome::NotWatched);
        }

        if reply.text.is_empty() {
            info!(uri = %reply.uri, "Reply contained no text, skipping");
            return Ok(Outcome::NoText);
        }

        let classification = self
            .classifier
            .classify(&reply.parent_text, &reply.text)
            .await?;
        let labels = classification.labels();

        for label in &labels {
            self.emitter
                .create_label(&LabelAssertion {
                    uri: reply.uri.clone(),
                    label: label.to_string(),
                })
                .await?;
        }

        info!(uri = %reply.uri, labels = ?labels, "Classified reply");
        Ok(Outcome::Labeled(labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_is_extracted() {
        assert_eq!(
            at_uri_authority("at://did:plc:abc/app.bsky.feed.post/3k1").unwrap(),
            "did:plc:abc"
        );
        assert_eq!(at_uri_authority("at://did:plc:abc").unwrap(), "did:plc:abc");
    }

    #[test]
    fn malformed_uris_are_rejected() {
        assert!(at_uri_authority("https://bsky.app/post/1").is_err());
        assert!(at_uri_authority("at:///app.bsky.feed.post/1").is_err());
        assert!(at_uri_authority("").is_err());
    }
}
