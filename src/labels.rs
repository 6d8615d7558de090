// Label definitions — the allow-list of values the relay will emit.
//
// The set is built once at startup and never changes afterwards. Membership
// is an exact string match: no case folding, no trimming of the candidate.

use std::collections::BTreeSet;

use anyhow::Result;

pub const LABEL_BAD_FAITH: &str = "bad-faith";
pub const LABEL_OFF_TOPIC: &str = "off-topic";
pub const LABEL_FUNNY: &str = "funny";

/// Labels accepted when no override is configured.
pub const DEFAULT_LABELS: [&str; 3] = [LABEL_BAD_FAITH, LABEL_OFF_TOPIC, LABEL_FUNNY];

/// Immutable set of permitted label values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: BTreeSet<String>,
}

impl LabelSet {
    /// Build a set from explicit values. Empty strings are dropped.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(Into::into)
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated override such as `LABELER_LABELS=funny,off-topic`.
    ///
    /// Entries are trimmed; blank entries are ignored. A list that ends up
    /// empty is rejected so the relay can't start with nothing to emit.
    pub fn parse_list(raw: &str) -> Result<Self> {
        let set = Self::new(raw.split(',').map(str::trim));
        if set.is_empty() {
            anyhow::bail!("label list {raw:?} contains no labels");
        }
        Ok(set)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_the_three_labels() {
        let set = LabelSet::default();
        assert_eq!(set.len(), 3);
        assert!(set.contains("bad-faith"));
        assert!(set.contains("off-topic"));
        assert!(set.contains("funny"));
    }

    #[test]
    fn membership_is_exact() {
        let set = LabelSet::default();
        assert!(!set.contains("spam"));
        assert!(!set.contains("Funny"));
        assert!(!set.contains(" funny"));
        assert!(!set.contains("bad_faith"));
        assert!(!set.contains(""));
    }

    #[test]
    fn parse_list_trims_and_skips_blanks() {
        let set = LabelSet::parse_list(" funny , ,spoiler,").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["funny", "spoiler"]);
    }

    #[test]
    fn parse_list_rejects_empty() {
        assert!(LabelSet::parse_list("").is_err());
        assert!(LabelSet::parse_list(" , ,").is_err());
    }
}
