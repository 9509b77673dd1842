//! # Message Store
//!
//! The ordered conversation log. Insertion order is chronological order and
//! display order.

use crate::mood::EmotionHistogram;
use crate::types::Message;

/// Number of trailing messages sent to the backend as context.
pub const DEFAULT_HISTORY_WINDOW: usize = 13;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Add a message to the end of the log.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Swap the entire log. Only restore goes through here.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The last `n` messages, oldest first.
    pub fn tail(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Emotion of every assistant message that has one, in log order.
    pub fn derived_emotions(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(Message::assistant_emotion)
            .collect()
    }

    pub fn histogram(&self) -> EmotionHistogram {
        EmotionHistogram::from_labels(self.derived_emotions())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MessageStore {
        let mut store = MessageStore::new();
        store.append(Message::user("one"));
        store.append(Message::assistant("two", "joy"));
        store.append(Message::user("three"));
        store.append(Message::assistant("four", "fear"));
        store
    }

    #[test]
    fn test_tail_keeps_order() {
        let store = sample();
        let tail: Vec<_> = store.tail(2).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(tail, vec!["three", "four"]);
        assert_eq!(store.tail(100).len(), 4);
        assert!(store.tail(0).is_empty());
    }

    #[test]
    fn test_derived_emotions_skips_untagged() {
        let mut store = sample();
        let mut untagged = Message::assistant("five", "");
        untagged.emotion = None;
        store.append(untagged);
        assert_eq!(store.derived_emotions(), vec!["joy", "fear"]);
    }

    #[test]
    fn test_replace_all_discards_previous_log() {
        let mut store = sample();
        store.replace_all(vec![Message::user("restored")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.last().map(|m| m.text.as_str()), Some("restored"));
    }
}
