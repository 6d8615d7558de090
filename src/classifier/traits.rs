// Reply classifier trait — the swap-ready abstraction over the model backend.

use anyhow::Result;
use async_trait::async_trait;

use crate::labels::{LABEL_BAD_FAITH, LABEL_FUNNY, LABEL_OFF_TOPIC};

/// Verdict for one reply. The flags are independent: a bad-faith reply can
/// also be funny.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub bad_faith: bool,
    pub off_topic: bool,
    pub funny: bool,
}

impl Classification {
    /// Labels to emit for this verdict, in a stable order.
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.bad_faith, LABEL_BAD_FAITH),
            (self.off_topic, LABEL_OFF_TOPIC),
            (self.funny, LABEL_FUNNY),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}

/// Trait for classifying a reply in the context of the post it answers.
#[async_trait]
pub trait ReplyClassifier: Send + Sync {
    async fn classify(&self, parent: &str, reply: &str) -> Result<Classification>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_means_no_labels() {
        assert!(Classification::default().labels().is_empty());
    }

    #[test]
    fn each_flag_maps_to_its_label() {
        let bad_faith = Classification {
            bad_faith: true,
            ..Default::default()
        };
        let off_topic = Classification {
            off_topic: true,
            ..Default::default()
        };
        let funny = Classification {
            funny: true,
            ..Default::default()
        };
        assert_eq!(bad_faith.labels(), vec!["bad-faith"]);
        assert_eq!(off_topic.labels(), vec!["off-topic"]);
        assert_eq!(funny.labels(), vec!["funny"]);
    }

    #[test]
    fn all_flags_map_to_all_labels() {
        let all = Classification {
            bad_faith: true,
            off_topic: true,
            funny: true,
        };
        assert_eq!(all.labels(), vec!["bad-faith", "off-topic", "funny"]);
    }
}
