//! # Mood
//!
//! The global mood follows the emotion of the latest completed assistant
//! message. The histogram is the per-session statistic behind the stats view.

use crate::store::MessageStore;
use crate::types::NEUTRAL;

/// A mood switch. The surface drops `previous` before applying `current`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodChange {
    pub previous: String,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodController {
    current: String,
}

impl Default for MoodController {
    fn default() -> Self {
        Self {
            current: NEUTRAL.to_string(),
        }
    }
}

impl MoodController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Set the mood. Empty or missing emotions fall back to neutral.
    /// Returns `None` when nothing changed.
    pub fn apply(&mut self, emotion: Option<&str>) -> Option<MoodChange> {
        let next = emotion
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(NEUTRAL);
        if next == self.current {
            return None;
        }
        let previous = std::mem::replace(&mut self.current, next.to_string());
        Some(MoodChange {
            previous,
            current: self.current.clone(),
        })
    }

    /// Re-derive the mood from a log, e.g. after restore.
    pub fn resync(&mut self, store: &MessageStore) -> Option<MoodChange> {
        let last = store.derived_emotions().last().map(|e| e.to_string());
        self.apply(last.as_deref())
    }
}

/// Emotion counts in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmotionHistogram {
    counts: Vec<(String, usize)>,
}

impl EmotionHistogram {
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut histogram = Self::default();
        for label in labels {
            match histogram.counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, count)) => *count += 1,
                None => histogram.counts.push((label.to_string(), 1)),
            }
        }
        histogram
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(l, c)| (l.as_str(), *c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn test_apply_replaces_previous_mood() {
        let mut mood = MoodController::new();
        assert_eq!(mood.apply(Some("neutral")), None);

        let change = mood.apply(Some("joy")).unwrap();
        assert_eq!(change.previous, "neutral");
        assert_eq!(change.current, "joy");

        assert_eq!(mood.apply(Some("joy")), None);
        let change = mood.apply(None).unwrap();
        assert_eq!(change.previous, "joy");
        assert_eq!(mood.current(), NEUTRAL);
    }

    #[test]
    fn test_resync_uses_last_tagged_assistant() {
        let mut store = MessageStore::new();
        store.append(Message::assistant("a", "anger"));
        store.append(Message::assistant("b", "surprise"));
        store.append(Message::user("c"));

        let mut mood = MoodController::new();
        mood.resync(&store);
        assert_eq!(mood.current(), "surprise");

        mood.resync(&MessageStore::new());
        assert_eq!(mood.current(), NEUTRAL);
    }

    #[test]
    fn test_histogram_counts_in_first_seen_order() {
        let histogram = EmotionHistogram::from_labels(["joy", "fear", "joy"]);
        let entries: Vec<_> = histogram.iter().collect();
        assert_eq!(entries, vec![("joy", 2), ("fear", 1)]);
        assert_eq!(histogram.total(), 3);
        assert_eq!(histogram.count("anger"), 0);
    }
}
