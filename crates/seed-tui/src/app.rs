use std::sync::Arc;
use std::time::Instant;

use seed_core::{
    ChatGateway, ChatReply, ChatResult, Conversation, HistoryBrowser, LoadedSession, PendingLoad,
    PendingSend, RestoreOutcome, SaveRequest, SessionSummary, THEME_KEY,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn, Instrument};

use crate::logging::session_span;

/// Results of background gateway calls, drained on the UI loop.
#[derive(Debug)]
pub enum GatewayEvent {
    Reply {
        epoch: u64,
        result: ChatResult<ChatReply>,
    },
    Loaded {
        load: PendingLoad,
        result: ChatResult<LoadedSession>,
    },
    Sessions(ChatResult<Vec<SessionSummary>>),
    LoggedOut(ChatResult<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    ConfirmNewChat,
    History,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

pub struct App {
    pub conversation: Conversation,
    gateway: Arc<dyn ChatGateway>,
    event_tx: mpsc::UnboundedSender<GatewayEvent>,
    event_rx: mpsc::UnboundedReceiver<GatewayEvent>,
    pub input: String,
    pub input_mode: InputMode,
    pub history: HistoryBrowser,
    pub history_loading: bool,
    pub theme: Theme,
    /// One-line notice shown in the status bar.
    pub notice: Option<String>,
    pub logged_out: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(conversation: Conversation, gateway: Arc<dyn ChatGateway>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let theme = Theme::parse(
            conversation
                .session()
                .local_store()
                .get(THEME_KEY)
                .as_deref(),
        );
        Self {
            conversation,
            gateway,
            event_tx,
            event_rx,
            input: String::new(),
            input_mode: InputMode::Normal,
            history: HistoryBrowser::new(),
            history_loading: false,
            theme,
            notice: None,
            logged_out: false,
            should_quit: false,
        }
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn start(&mut self, now: Instant) {
        info!("Chat started with session {}", self.conversation.sid());
        self.conversation.greet(now);
    }

    pub fn push_input(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input(&mut self) {
        self.input.pop();
    }

    /// Enter: hand the input to the conversation and send it in the
    /// background. The input is kept while a reply is in progress.
    pub fn submit(&mut self) {
        if self.input.trim().is_empty() {
            self.input.clear();
            return;
        }
        match self.conversation.submit(&self.input) {
            Some(pending) => {
                self.input.clear();
                self.spawn_send(pending);
            }
            None => self.notice = Some("Wait for SEED to finish replying".to_string()),
        }
    }

    /// Drain finished gateway calls.
    pub fn process_events(&mut self, now: Instant) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event, now);
        }
    }

    pub fn handle_event(&mut self, event: GatewayEvent, now: Instant) {
        match event {
            GatewayEvent::Reply { epoch, result } => {
                self.conversation.on_reply(epoch, result, now);
            }
            GatewayEvent::Loaded { load, result } => self.on_loaded(load, result),
            GatewayEvent::Sessions(result) => {
                self.history_loading = false;
                match result {
                    Ok(sessions) => self.history.set_entries(sessions),
                    Err(e) => {
                        warn!("Failed to list sessions: {}", e);
                        self.notice = Some(format!("Could not load history: {}", e));
                    }
                }
            }
            GatewayEvent::LoggedOut(result) => {
                if let Err(e) = result {
                    error!("Logout failed: {}", e);
                }
                self.logged_out = true;
                self.should_quit = true;
            }
        }
    }

    fn on_loaded(&mut self, load: PendingLoad, result: ChatResult<LoadedSession>) {
        match self.conversation.on_loaded(&load, result) {
            Ok(RestoreOutcome::Restored { outgoing }) => {
                if let Some(save) = outgoing {
                    self.spawn_save(save);
                }
                self.input_mode = InputMode::Normal;
                self.notice = Some(format!("Restored chat {}", load.sid));
            }
            Ok(RestoreOutcome::Superseded) => {}
            Err(e) => {
                warn!("Failed to restore session {}: {}", load.sid, e);
                self.notice = Some(format!("Could not open that chat: {}", e));
            }
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        if let Some(save) = self.conversation.tick(now) {
            self.spawn_save(save);
        }
    }

    pub fn request_new_chat(&mut self) {
        self.input_mode = InputMode::ConfirmNewChat;
    }

    pub fn confirm_new_chat(&mut self, now: Instant) {
        if let Some(save) = self.conversation.new_chat(now) {
            self.spawn_save(save);
        }
        self.input.clear();
        self.input_mode = InputMode::Normal;
        self.notice = Some("Started a new chat".to_string());
    }

    pub fn cancel_dialog(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn open_history(&mut self) {
        self.history.reset();
        self.history_loading = true;
        self.input_mode = InputMode::History;

        let gateway = Arc::clone(&self.gateway);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = gateway.list_sessions().await;
            let _ = tx.send(GatewayEvent::Sessions(result));
        });
    }

    /// Restore the highlighted history entry. The panel stays open until
    /// the load succeeds.
    pub fn restore_selected(&mut self) {
        let Some(sid) = self.history.selected().map(|s| s.sid.clone()) else {
            return;
        };
        let load = self.conversation.request_restore(sid);

        let gateway = Arc::clone(&self.gateway);
        let tx = self.event_tx.clone();
        let span = session_span(&load.sid);
        tokio::spawn(
            async move {
                let result = gateway.load_session(&load.sid).await;
                let _ = tx.send(GatewayEvent::Loaded { load, result });
            }
            .instrument(span),
        );
    }

    pub fn toggle_stats(&mut self) {
        self.input_mode = match self.input_mode {
            InputMode::Stats => InputMode::Normal,
            _ => InputMode::Stats,
        };
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(e) = self
            .conversation
            .session_mut()
            .local_store_mut()
            .set(THEME_KEY, self.theme.as_str())
        {
            warn!("Failed to persist theme: {}", e);
        }
    }

    pub fn logout(&mut self) {
        if let Some(save) = self.conversation.flush_autosave() {
            self.spawn_save(save);
        }
        let gateway = Arc::clone(&self.gateway);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = gateway.logout().await;
            let _ = tx.send(GatewayEvent::LoggedOut(result));
        });
    }

    /// Flush a pending autosave and wait for it before exiting.
    pub async fn shutdown(&mut self) {
        if let Some(save) = self.conversation.flush_autosave() {
            if let Err(e) = self.gateway.save(&save).await {
                warn!("Final save of {} failed: {}", save.sid, e);
            }
        }
    }

    pub fn scroll_up(&mut self, units: usize) {
        self.conversation.transcript_mut().scroll_up(units);
    }

    pub fn scroll_down(&mut self, units: usize) {
        self.conversation.transcript_mut().scroll_down(units);
    }

    fn spawn_send(&self, pending: PendingSend) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.event_tx.clone();
        let span = session_span(self.conversation.sid());
        tokio::spawn(
            async move {
                let result = gateway.send(&pending.request).await;
                let _ = tx.send(GatewayEvent::Reply {
                    epoch: pending.epoch,
                    result,
                });
            }
            .instrument(span),
        );
    }

    /// Saves are fire-and-forget: failures are logged, never shown.
    fn spawn_save(&self, save: SaveRequest) {
        let gateway = Arc::clone(&self.gateway);
        let span = session_span(&save.sid);
        tokio::spawn(
            async move {
                if let Err(e) = gateway.save(&save).await {
                    warn!("Autosave failed: {}", e);
                }
            }
            .instrument(span),
        );
    }
}
