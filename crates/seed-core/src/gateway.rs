//! # Chat Gateway
//!
//! The backend boundary: request/response types and the async trait the
//! HTTP client implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ChatResult};
use crate::types::{Message, SessionSummary, NEUTRAL, SADNESS};

/// Shown when the backend cannot be reached or answers with a non-2xx status.
pub const CONNECTIVITY_FALLBACK: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

/// Reply text used when the backend returns an empty reply.
pub const EMPTY_REPLY: &str = "...";

/// `POST /api/chat` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<Message>,
}

/// `POST /api/chat` response: either a reply or an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn ok(reply: impl Into<String>, emotion: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            emotion: Some(emotion.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// `POST /api/save` body; also the autosave payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub sid: String,
    pub chat: Vec<Message>,
}

/// `GET /api/load` response. `chat` is optional on the wire so a malformed
/// payload can be told apart from a transport failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedSession {
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub chat: Option<Vec<Message>>,
}

impl LoadedSession {
    pub fn new(sid: impl Into<String>, chat: Vec<Message>) -> Self {
        Self {
            sid: Some(sid.into()),
            title: None,
            chat: Some(chat),
        }
    }

    /// Validate the payload. `requested` is used when the backend omits `sid`.
    pub fn into_parts(self, requested: &str) -> ChatResult<(String, Vec<Message>)> {
        let sid = self
            .sid
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| requested.to_string());
        match self.chat {
            Some(chat) => Ok((sid, chat)),
            None => Err(ChatError::MalformedHistory { sid }),
        }
    }
}

/// `GET /api/session-check` response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCheck {
    #[serde(default)]
    pub logged_in: bool,
}

/// Text and emotion the client reveals for a send outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyReveal {
    pub text: String,
    pub emotion: String,
}

impl ReplyReveal {
    /// Map a send result onto what the user sees. Errors never escape.
    pub fn from_result(result: ChatResult<ChatReply>) -> Self {
        match result {
            Ok(ChatReply {
                error: Some(error), ..
            }) if !error.is_empty() => Self {
                text: format!("Error: {}", error),
                emotion: SADNESS.to_string(),
            },
            Ok(reply) => Self {
                text: reply
                    .reply
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| EMPTY_REPLY.to_string()),
                emotion: reply
                    .emotion
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| NEUTRAL.to_string()),
            },
            Err(_) => Self {
                text: CONNECTIVITY_FALLBACK.to_string(),
                emotion: SADNESS.to_string(),
            },
        }
    }
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> ChatResult<ChatReply>;

    /// Fire-and-forget persistence of a whole session.
    async fn save(&self, request: &SaveRequest) -> ChatResult<()>;

    async fn list_sessions(&self) -> ChatResult<Vec<SessionSummary>>;

    async fn load_session(&self, sid: &str) -> ChatResult<LoadedSession>;

    async fn session_check(&self) -> ChatResult<bool>;

    async fn logout(&self) -> ChatResult<()>;
}
