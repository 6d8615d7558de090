// Label authority trait — the consumed interface of the external labeler.

use anyhow::Result;
use async_trait::async_trait;

/// A validated request to label one subject.
///
/// Only constructed by the admission handler after every check has passed,
/// so `label` is always a member of the configured label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAssertion {
    /// Opaque subject identifier, usually an `at://` URI.
    pub uri: String,
    /// Label value to apply.
    pub label: String,
}

/// Something that can produce and publish a signed label record.
///
/// Implementations must be async because the real authority sits behind a
/// network call. A failed call is returned as-is; callers decide how to
/// report it and never retry.
#[async_trait]
pub trait LabelAuthority: Send + Sync {
    /// Create one label record for `assertion`.
    async fn create_label(&self, assertion: &LabelAssertion) -> Result<()>;
}
