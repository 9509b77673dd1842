//! # Conversation
//!
//! Command handlers for the chat surface. A front end owns one
//! [`Conversation`], forwards user commands and gateway completions to it,
//! runs the returned requests against a [`ChatGateway`](crate::ChatGateway),
//! and calls [`Conversation::tick`] from its timer.
//!
//! All mutation of the session goes through here, on one task, so no locking
//! is involved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::debounce::DEFAULT_AUTOSAVE_DEBOUNCE;
use crate::error::{ChatError, ChatResult};
use crate::gateway::{ChatReply, ChatRequest, LoadedSession, ReplyReveal, SaveRequest};
use crate::local_store::LocalStore;
use crate::mood::{EmotionHistogram, MoodController};
use crate::render::{RenderPipeline, Transcript};
use crate::sanitize::Sanitizer;
use crate::session::SessionManager;
use crate::store::{MessageStore, DEFAULT_HISTORY_WINDOW};
use crate::typewriter::DEFAULT_STEP_INTERVAL;
use crate::types::{Message, NEUTRAL};

pub const DEFAULT_GREETING: &str =
    "Hi, I'm SEED 🌱. How are you feeling today? I'm here to listen.";

#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Trailing messages sent with each request.
    pub history_window: usize,
    pub typing_interval: Duration,
    pub autosave_debounce: Duration,
    pub greeting: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            typing_interval: DEFAULT_STEP_INTERVAL,
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

/// A send the caller must run. The reply goes back through
/// [`Conversation::on_reply`] together with `epoch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub epoch: u64,
    pub request: ChatRequest,
}

/// A history load the caller must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub ticket: u64,
    pub sid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// State replaced. `outgoing` is the previous session's pending save.
    Restored { outgoing: Option<SaveRequest> },
    /// A newer load or a new chat superseded this one; nothing changed.
    Superseded,
}

pub struct Conversation {
    config: ConversationConfig,
    session: SessionManager,
    render: RenderPipeline,
    mood: MoodController,
    /// Epoch of the send whose reply is outstanding.
    awaiting_reply: Option<u64>,
    load_ticket: u64,
    pending_load: Option<u64>,
}

impl Conversation {
    pub fn new(
        config: ConversationConfig,
        local: Box<dyn LocalStore>,
        sanitizer: Arc<dyn Sanitizer>,
    ) -> Self {
        let session = SessionManager::start(local, config.autosave_debounce);
        let render = RenderPipeline::new(sanitizer).with_step_interval(config.typing_interval);
        Self {
            config,
            session,
            render,
            mood: MoodController::new(),
            awaiting_reply: None,
            load_ticket: 0,
            pending_load: None,
        }
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager {
        &mut self.session
    }

    pub fn sid(&self) -> &str {
        self.session.sid()
    }

    pub fn log(&self) -> &MessageStore {
        self.session.log()
    }

    pub fn transcript(&self) -> &Transcript {
        self.render.transcript()
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        self.render.transcript_mut()
    }

    pub fn mood(&self) -> &str {
        self.mood.current()
    }

    pub fn histogram(&self) -> EmotionHistogram {
        self.session.log().histogram()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply.is_some()
    }

    pub fn is_revealing(&self) -> bool {
        self.render.is_revealing()
    }

    /// A reply is outstanding or being revealed.
    pub fn is_busy(&self) -> bool {
        self.is_awaiting_reply() || self.is_revealing()
    }

    /// Reveal the greeting through the normal assistant path.
    pub fn greet(&mut self, now: Instant) {
        let greeting = self.config.greeting.clone();
        self.render.begin_reveal(&greeting, NEUTRAL, now);
    }

    /// Handle a user submission. Blank input and submissions while a reply
    /// is in progress are ignored.
    pub fn submit(&mut self, input: &str) -> Option<PendingSend> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        if self.is_busy() {
            debug!("submit ignored while a reply is in progress");
            return None;
        }

        let message = Message::user(text);
        self.render.render_message(&message);
        self.session.append(message);
        self.render.show_typing_indicator();

        let epoch = self.session.epoch();
        self.awaiting_reply = Some(epoch);
        Some(PendingSend {
            epoch,
            request: ChatRequest {
                message: text.to_string(),
                history: self.session.log().tail(self.config.history_window).to_vec(),
            },
        })
    }

    /// Apply the outcome of a send. Returns false if the reply belongs to a
    /// session that is no longer active.
    pub fn on_reply(&mut self, epoch: u64, result: ChatResult<ChatReply>, now: Instant) -> bool {
        if epoch != self.session.epoch() || self.awaiting_reply != Some(epoch) {
            debug!("dropping stale reply for epoch {}", epoch);
            return false;
        }
        if let Err(e) = &result {
            warn!("Chat request failed: {}", e);
        }
        self.awaiting_reply = None;

        let reveal = ReplyReveal::from_result(result);
        self.render.begin_reveal(&reveal.text, &reveal.emotion, now);
        true
    }

    /// Drive timers: typewriter steps and the autosave debounce. Returns a
    /// save the caller must send.
    pub fn tick(&mut self, now: Instant) -> Option<SaveRequest> {
        if let Some(message) = self.render.tick(now) {
            self.commit_reply(message, now);
        }
        self.session.poll_autosave(now)
    }

    /// Force out a pending autosave.
    pub fn flush_autosave(&mut self) -> Option<SaveRequest> {
        self.session.flush_autosave()
    }

    /// Earliest instant at which [`Conversation::tick`] has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.render.next_deadline(), self.session.autosave_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn commit_reply(&mut self, message: Message, now: Instant) {
        let emotion = message.assistant_emotion().map(str::to_string);
        self.session.append(message);
        if let Some(change) = self.mood.apply(emotion.as_deref()) {
            self.render.apply_mood(&change);
        }
        self.session.schedule_autosave(now);
    }

    /// Start over under a new identity. The caller has already confirmed
    /// with the user. Returns the outgoing session's pending save.
    pub fn new_chat(&mut self, now: Instant) -> Option<SaveRequest> {
        self.render.cancel_reveal();
        self.awaiting_reply = None;
        self.pending_load = None;

        let outgoing = self.session.reset();
        if let Some(change) = self.mood.apply(Some(NEUTRAL)) {
            self.render.apply_mood(&change);
        }
        self.render.full_redraw(&[]);
        self.greet(now);
        outgoing
    }

    /// Begin restoring a saved session. Only the latest request may apply.
    pub fn request_restore(&mut self, sid: impl Into<String>) -> PendingLoad {
        self.load_ticket += 1;
        self.pending_load = Some(self.load_ticket);
        PendingLoad {
            ticket: self.load_ticket,
            sid: sid.into(),
        }
    }

    /// Apply a loaded session. Errors (transport or a payload without
    /// `chat`) leave every piece of state untouched.
    pub fn on_loaded(
        &mut self,
        load: &PendingLoad,
        result: ChatResult<LoadedSession>,
    ) -> ChatResult<RestoreOutcome> {
        if self.pending_load != Some(load.ticket) {
            debug!("dropping superseded load of {}", load.sid);
            return Ok(RestoreOutcome::Superseded);
        }
        self.pending_load = None;

        let (sid, chat) = result.and_then(|loaded| loaded.into_parts(&load.sid))?;
        self.restore(sid, chat)
    }

    fn restore(&mut self, sid: String, chat: Vec<Message>) -> ChatResult<RestoreOutcome> {
        if sid.trim().is_empty() {
            return Err(ChatError::MalformedHistory { sid });
        }
        self.render.cancel_reveal();
        self.awaiting_reply = None;

        let outgoing = self.session.replace(sid, chat);
        self.render.full_redraw(self.session.log().messages());
        if let Some(change) = self.mood.resync(self.session.log()) {
            self.render.apply_mood(&change);
        }
        info!(
            "Session {} restored with mood {}",
            self.session.sid(),
            self.mood.current()
        );
        Ok(RestoreOutcome::Restored { outgoing })
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("session", &self.session)
            .field("render", &self.render)
            .field("mood", &self.mood)
            .field("awaiting_reply", &self.awaiting_reply)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::MemoryStore;
    use crate::sanitize::MarkdownSanitizer;
    use crate::types::{Role, SADNESS};

    fn conversation() -> Conversation {
        Conversation::new(
            ConversationConfig::default(),
            Box::new(MemoryStore::new()),
            Arc::new(MarkdownSanitizer),
        )
    }

    fn finish_reveal(c: &mut Conversation, now: Instant) -> Option<SaveRequest> {
        c.tick(now + Duration::from_secs(3600))
    }

    #[test]
    fn test_blank_submit_is_ignored() {
        let mut c = conversation();
        assert!(c.submit("   \n\t").is_none());
        assert!(c.log().is_empty());
        assert!(c.transcript().is_empty());
    }

    #[test]
    fn test_user_message_stored_and_rendered_before_request() {
        let mut c = conversation();
        let pending = c.submit("  Hello  ").unwrap();
        assert_eq!(pending.request.message, "Hello");
        assert_eq!(pending.request.history, vec![Message::user("Hello")]);
        assert_eq!(c.log().len(), 1);
        // user unit plus typing indicator
        assert_eq!(c.transcript().len(), 2);
        assert!(c.is_awaiting_reply());
    }

    #[test]
    fn test_history_is_bounded_by_window() {
        let mut c = conversation();
        let now = Instant::now();
        for i in 0..10 {
            let pending = c.submit(&format!("q{}", i)).unwrap();
            c.on_reply(pending.epoch, Ok(ChatReply::ok(format!("a{}", i), "joy")), now);
            finish_reveal(&mut c, now);
        }
        let pending = c.submit("last").unwrap();
        assert_eq!(pending.request.history.len(), DEFAULT_HISTORY_WINDOW);
        assert_eq!(
            pending.request.history.last(),
            Some(&Message::user("last"))
        );
    }

    #[test]
    fn test_hello_joy_example() {
        let mut c = conversation();
        let now = Instant::now();
        let pending = c.submit("Hello").unwrap();
        assert!(c.on_reply(pending.epoch, Ok(ChatReply::ok("Hi there!", "joy")), now));
        assert_eq!(c.log().len(), 1);
        finish_reveal(&mut c, now);

        assert_eq!(
            c.log().messages(),
            &[Message::user("Hello"), Message::assistant("Hi there!", "joy")]
        );
        assert_eq!(c.mood(), "joy");
        assert_eq!(c.transcript().mood_class(), "mood-joy");
        assert_eq!(c.histogram().iter().collect::<Vec<_>>(), vec![("joy", 1)]);
    }

    #[test]
    fn test_empty_reveal_commits_on_first_tick() {
        let mut c = Conversation::new(
            ConversationConfig {
                greeting: String::new(),
                ..ConversationConfig::default()
            },
            Box::new(MemoryStore::new()),
            Arc::new(MarkdownSanitizer),
        );
        let now = Instant::now();
        c.greet(now);
        c.tick(now);

        assert_eq!(c.log().len(), 1);
        assert!(!c.is_revealing());
        c.tick(now + Duration::from_secs(1));
        assert_eq!(c.log().len(), 1);
    }

    #[test]
    fn test_backend_error_example() {
        let mut c = conversation();
        let now = Instant::now();
        let pending = c.submit("hi").unwrap();
        c.on_reply(pending.epoch, Ok(ChatReply::error("rate limited")), now);
        finish_reveal(&mut c, now);

        let last = c.log().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, "Error: rate limited");
        assert_eq!(last.emotion.as_deref(), Some(SADNESS));
        assert_eq!(c.mood(), SADNESS);
    }

    #[test]
    fn test_submit_ignored_while_reply_in_progress() {
        let mut c = conversation();
        let now = Instant::now();
        let pending = c.submit("one").unwrap();
        assert!(c.submit("two").is_none());
        c.on_reply(pending.epoch, Ok(ChatReply::ok("long reply", "joy")), now);
        assert!(c.submit("three").is_none());
        finish_reveal(&mut c, now);
        assert!(c.submit("four").is_some());
    }

    #[test]
    fn test_new_chat_mid_reveal_commits_nothing() {
        let mut c = conversation();
        let now = Instant::now();
        let pending = c.submit("tell me a story").unwrap();
        c.on_reply(pending.epoch, Ok(ChatReply::ok("Once upon a time", "joy")), now);
        c.tick(now);
        assert!(c.is_revealing());
        let old_sid = c.sid().to_string();

        c.new_chat(now);
        assert_ne!(c.sid(), old_sid);
        assert!(c.log().is_empty());
        assert_eq!(c.mood(), NEUTRAL);

        // only the greeting is being revealed
        assert_eq!(c.transcript().len(), 1);
        finish_reveal(&mut c, now);
        assert_eq!(
            c.log().messages(),
            &[Message::assistant(DEFAULT_GREETING, NEUTRAL)]
        );
    }

    #[test]
    fn test_reply_after_new_chat_is_stale() {
        let mut c = conversation();
        let now = Instant::now();
        let pending = c.submit("hello?").unwrap();
        c.new_chat(now);
        finish_reveal(&mut c, now);

        assert!(!c.on_reply(pending.epoch, Ok(ChatReply::ok("late", "anger")), now));
        finish_reveal(&mut c, now);
        assert_eq!(c.log().len(), 1);
        assert_eq!(c.mood(), NEUTRAL);
    }

    #[test]
    fn test_restore_replaces_and_resyncs_mood() {
        let mut c = conversation();
        let now = Instant::now();
        let pending = c.submit("hi").unwrap();
        c.on_reply(pending.epoch, Ok(ChatReply::ok("yo", "anger")), now);
        c.tick(now);

        let load = c.request_restore("555");
        let chat = vec![
            Message::user("a"),
            Message::assistant("b", "fear"),
            Message::user("c"),
        ];
        let outcome = c
            .on_loaded(&load, Ok(LoadedSession::new("555", chat.clone())))
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored { outgoing: None });

        assert_eq!(c.sid(), "555");
        assert_eq!(c.log().messages(), chat.as_slice());
        assert_eq!(c.mood(), "fear");
        assert!(!c.is_revealing());
        assert_eq!(c.transcript().message_units().count(), 3);
    }

    #[test]
    fn test_malformed_restore_mutates_nothing() {
        let mut c = conversation();
        let now = Instant::now();
        let pending = c.submit("hi").unwrap();
        c.on_reply(pending.epoch, Ok(ChatReply::ok("hey", "joy")), now);
        finish_reveal(&mut c, now);
        let sid = c.sid().to_string();
        let log = c.log().clone();

        let load = c.request_restore("9");
        let result = c.on_loaded(
            &load,
            Ok(LoadedSession {
                sid: Some("9".to_string()),
                title: None,
                chat: None,
            }),
        );
        assert!(matches!(result, Err(ChatError::MalformedHistory { .. })));
        assert_eq!(c.sid(), sid);
        assert_eq!(c.log(), &log);
        assert_eq!(c.mood(), "joy");
    }

    #[test]
    fn test_only_latest_load_applies() {
        let mut c = conversation();
        let first = c.request_restore("1");
        let second = c.request_restore("2");

        let outcome = c
            .on_loaded(&first, Ok(LoadedSession::new("1", vec![Message::user("one")])))
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::Superseded);

        c.on_loaded(&second, Ok(LoadedSession::new("2", vec![Message::user("two")])))
            .unwrap();
        assert_eq!(c.sid(), "2");
    }

    #[test]
    fn test_autosave_coalesces_completions() {
        let mut c = conversation();
        let start = Instant::now();
        let mut saves = Vec::new();
        for i in 0..3u64 {
            let at = start + Duration::from_millis(300 * i);
            let pending = c.submit(&format!("q{}", i)).unwrap();
            c.on_reply(pending.epoch, Ok(ChatReply::ok("ok", "joy")), at);
            saves.extend(c.tick(at));
            saves.extend(c.tick(at + Duration::from_millis(100)));
        }
        assert!(saves.is_empty());

        saves.extend(c.tick(start + Duration::from_secs(5)));
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].chat.len(), 6);
        assert_eq!(saves[0].sid, c.sid());
    }
}
