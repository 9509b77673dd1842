//! # Chat Error Types
//!
//! Errors raised by the gateway, the local store and restore reconciliation.

use thiserror::Error;

/// Client error type
#[derive(Error, Debug)]
pub enum ChatError {
    /// Request could not be delivered (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status
    #[error("api error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Load payload without a `chat` array
    #[error("malformed history for session {sid}")]
    MalformedHistory { sid: String },

    /// Durable local storage failed
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
