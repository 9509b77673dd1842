//! # Session Manager
//!
//! Owns the active (session identity, conversation log) pair and every
//! transition of it: cold start, new chat and restore. Also owns the
//! debounced autosave.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::debounce::Debouncer;
use crate::gateway::SaveRequest;
use crate::local_store::{LocalStore, SID_KEY};
use crate::store::MessageStore;
use crate::types::Message;

/// The identity and log of the active conversation. They are only ever
/// created and replaced together.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionState {
    sid: String,
    log: MessageStore,
    /// Bumped on every transition; in-flight work tagged with an older epoch
    /// is stale.
    epoch: u64,
}

impl SessionState {
    fn snapshot(&self) -> SaveRequest {
        SaveRequest {
            sid: self.sid.clone(),
            chat: self.log.messages().to_vec(),
        }
    }
}

pub struct SessionManager {
    state: SessionState,
    local: Box<dyn LocalStore>,
    autosave: Debouncer,
}

impl SessionManager {
    /// Cold start: reuse the persisted identity or mint a new one. The log
    /// starts empty; prior history is only loaded on request.
    pub fn start(local: Box<dyn LocalStore>, autosave_window: Duration) -> Self {
        let mut manager = Self {
            state: SessionState {
                sid: String::new(),
                log: MessageStore::new(),
                epoch: 0,
            },
            local,
            autosave: Debouncer::new(autosave_window),
        };

        match manager.local.get(SID_KEY).filter(|s| !s.trim().is_empty()) {
            Some(sid) => {
                info!("Resuming session identity {}", sid);
                manager.state.sid = sid;
            }
            None => {
                let sid = mint_sid(None);
                info!("Minted session identity {}", sid);
                manager.state.sid = sid;
                manager.persist_sid();
            }
        }
        manager
    }

    pub fn sid(&self) -> &str {
        &self.state.sid
    }

    pub fn log(&self) -> &MessageStore {
        &self.state.log
    }

    pub fn epoch(&self) -> u64 {
        self.state.epoch
    }

    pub fn local_store(&self) -> &dyn LocalStore {
        &*self.local
    }

    pub fn local_store_mut(&mut self) -> &mut dyn LocalStore {
        &mut *self.local
    }

    /// Live-chat append.
    pub fn append(&mut self, message: Message) {
        self.state.log.append(message);
    }

    /// Restart the autosave quiet period.
    pub fn schedule_autosave(&mut self, now: Instant) {
        self.autosave.trigger(now);
        debug!("autosave scheduled for {}", self.state.sid);
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    /// Snapshot taken when the debounce fires, never when it was scheduled.
    pub fn poll_autosave(&mut self, now: Instant) -> Option<SaveRequest> {
        self.autosave
            .fire_if_due(now)
            .then(|| self.state.snapshot())
    }

    /// Fire a pending autosave right away.
    pub fn flush_autosave(&mut self) -> Option<SaveRequest> {
        self.autosave.flush().then(|| self.state.snapshot())
    }

    /// New chat: empty log under a fresh identity. Returns the outgoing
    /// session's pending save, if any.
    pub fn reset(&mut self) -> Option<SaveRequest> {
        let outgoing = self.flush_autosave();
        let sid = mint_sid(Some(&self.state.sid));
        info!("New chat {} (was {})", sid, self.state.sid);
        self.state = SessionState {
            sid,
            log: MessageStore::new(),
            epoch: self.state.epoch + 1,
        };
        self.persist_sid();
        outgoing
    }

    /// Restore: swap identity and log wholesale. Returns the outgoing
    /// session's pending save, if any.
    pub fn replace(&mut self, sid: String, messages: Vec<Message>) -> Option<SaveRequest> {
        let outgoing = self.flush_autosave();
        info!("Restored session {} ({} messages)", sid, messages.len());
        self.state = SessionState {
            sid,
            log: MessageStore::from_messages(messages),
            epoch: self.state.epoch + 1,
        };
        self.persist_sid();
        outgoing
    }

    fn persist_sid(&mut self) {
        if let Err(e) = self.local.set(SID_KEY, &self.state.sid) {
            warn!("Failed to persist session identity: {}", e);
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state)
            .field("autosave", &self.autosave)
            .finish()
    }
}

/// Timestamp-derived identity (Unix milliseconds), never equal to `previous`.
pub fn mint_sid(previous: Option<&str>) -> String {
    let mut millis = Utc::now().timestamp_millis();
    if let Some(prev) = previous.and_then(|p| p.parse::<i64>().ok()) {
        if millis <= prev {
            millis = prev.saturating_add(1);
        }
    }
    millis.to_string()
}
