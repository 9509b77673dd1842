//! # Conversation Types
//!
//! Messages, roles and session summaries shared by every layer of the client.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Default mood label, used whenever no emotion is known.
pub const NEUTRAL: &str = "neutral";

/// Emotion attached to error and connectivity replies.
pub const SADNESS: &str = "sadness";

/// The emotion vocabulary the backend is expected to produce.
pub const EMOTIONS: [&str; 7] = [
    "joy", "sadness", "anger", "fear", "disgust", "surprise", NEUTRAL,
];

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the conversation log.
///
/// Serialized exactly as the backend stores it:
/// `{"role": "assistant", "text": "...", "emotion": "joy"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
}

impl Message {
    /// User message; users never carry an emotion.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            emotion: None,
        }
    }

    /// Assistant message with its emotion tag.
    pub fn assistant(text: impl Into<String>, emotion: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            emotion: Some(emotion.into()),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Emotion label, only for assistant messages that have a non-empty one.
    pub fn assistant_emotion(&self) -> Option<&str> {
        if !self.is_assistant() {
            return None;
        }
        self.emotion.as_deref().filter(|e| !e.is_empty())
    }
}

/// Row of the saved-session list returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub sid: String,
    #[serde(default)]
    pub title: String,
    /// Last update, Unix epoch seconds.
    pub updated: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl SessionSummary {
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.updated, 0).single()
    }

    /// `updated` rendered as local date and time.
    pub fn updated_local(&self) -> String {
        match self.updated_at() {
            Some(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "-".to_string(),
        }
    }
}
