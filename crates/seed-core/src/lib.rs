//! # SEED Core
//!
//! Client-side conversation state machine for the SEED chat client.
//!
//! ## Components
//!
//! - **MessageStore**: the ordered conversation log
//! - **RenderPipeline**: log to [`Transcript`], typing indicator and
//!   typewriter reveal, with every body passed through a [`Sanitizer`]
//! - **MoodController**: the mood theme derived from assistant emotions
//! - **SessionManager**: session identity, debounced autosave, restore
//! - **ChatGateway**: the backend contract
//! - **Conversation**: command handlers tying the above together
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//! use seed_core::{Conversation, ConversationConfig, MarkdownSanitizer, MemoryStore, ChatReply};
//!
//! let mut conversation = Conversation::new(
//!     ConversationConfig::default(),
//!     Box::new(MemoryStore::new()),
//!     Arc::new(MarkdownSanitizer),
//! );
//!
//! if let Some(pending) = conversation.submit("Hello") {
//!     // run pending.request against a gateway, then:
//!     conversation.on_reply(pending.epoch, Ok(ChatReply::ok("Hi there!", "joy")), Instant::now());
//! }
//! let save = conversation.tick(Instant::now());
//! ```

pub mod conversation;
pub mod debounce;
pub mod error;
pub mod gateway;
pub mod history;
pub mod local_store;
pub mod mood;
pub mod render;
pub mod sanitize;
pub mod session;
pub mod store;
pub mod typewriter;
pub mod types;

pub use conversation::{
    Conversation, ConversationConfig, PendingLoad, PendingSend, RestoreOutcome, DEFAULT_GREETING,
};
pub use debounce::Debouncer;
pub use error::{ChatError, ChatResult};
pub use gateway::{
    ChatGateway, ChatReply, ChatRequest, LoadedSession, ReplyReveal, SaveRequest, SessionCheck,
    CONNECTIVITY_FALLBACK,
};
pub use history::HistoryBrowser;
pub use local_store::{LocalStore, MemoryStore, SID_KEY, THEME_KEY};
pub use mood::{EmotionHistogram, MoodChange, MoodController};
pub use render::{Alignment, RenderPipeline, RenderedUnit, Transcript, UnitKind, ASSISTANT_AVATAR};
pub use sanitize::{MarkdownSanitizer, Sanitizer};
pub use session::SessionManager;
pub use store::MessageStore;
pub use typewriter::{Step, Typewriter};
pub use types::{Message, Role, SessionSummary, EMOTIONS, NEUTRAL, SADNESS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
