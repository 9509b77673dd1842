//! # Render Pipeline
//!
//! Projects the conversation log onto a [`Transcript`], the surface-neutral
//! view model a front end draws. Owns the typing indicator and the running
//! typewriter reveal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::mood::MoodChange;
use crate::sanitize::Sanitizer;
use crate::typewriter::{Step, Typewriter, CURSOR, DEFAULT_STEP_INTERVAL};
use crate::types::{Message, Role, NEUTRAL};

/// Avatar shown next to assistant units.
pub const ASSISTANT_AVATAR: &str = "🌱";

pub type UnitId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Message(Role),
    /// The "assistant is composing" marker.
    Typing,
}

/// One visual unit of the transcript. `body` is always sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUnit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub avatar: Option<&'static str>,
    pub align: Alignment,
    pub body: String,
    pub emotion: Option<String>,
    pub revealing: bool,
}

/// The visible surface.
#[derive(Debug, Clone)]
pub struct Transcript {
    units: Vec<RenderedUnit>,
    next_id: UnitId,
    /// Units scrolled back from the end; zero means following the tail.
    scroll_back: usize,
    mood: String,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            next_id: 1,
            scroll_back: 0,
            mood: NEUTRAL.to_string(),
        }
    }
}

impl Transcript {
    pub fn units(&self) -> &[RenderedUnit] {
        &self.units
    }

    pub fn get(&self, id: UnitId) -> Option<&RenderedUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Units showing a conversation message (typing marker excluded).
    pub fn message_units(&self) -> impl Iterator<Item = &RenderedUnit> {
        self.units
            .iter()
            .filter(|u| matches!(u.kind, UnitKind::Message(_)))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn scroll_back(&self) -> usize {
        self.scroll_back
    }

    pub fn is_following_tail(&self) -> bool {
        self.scroll_back == 0
    }

    pub fn scroll_up(&mut self, units: usize) {
        self.scroll_back = (self.scroll_back + units).min(self.units.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self, units: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(units);
    }

    /// Show the most recent content.
    pub fn autoscroll(&mut self) {
        self.scroll_back = 0;
    }

    /// Theme class currently applied, e.g. `mood-joy`.
    pub fn mood_class(&self) -> String {
        format!("mood-{}", self.mood)
    }

    pub fn mood(&self) -> &str {
        &self.mood
    }

    /// Exactly one mood marker at a time: the previous one is replaced.
    pub fn apply_mood(&mut self, change: &MoodChange) {
        debug!("mood {} -> {}", change.previous, change.current);
        self.mood = change.current.clone();
    }

    fn push(&mut self, mut unit: RenderedUnit) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        unit.id = id;
        self.units.push(unit);
        self.autoscroll();
        id
    }

    fn unit_mut(&mut self, id: UnitId) -> Option<&mut RenderedUnit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    fn remove(&mut self, id: UnitId) -> bool {
        let before = self.units.len();
        self.units.retain(|u| u.id != id);
        before != self.units.len()
    }

    fn clear(&mut self) {
        self.units.clear();
        self.autoscroll();
    }
}

#[derive(Debug)]
struct ActiveReveal {
    typewriter: Typewriter,
    unit: UnitId,
}

/// Progress report of the running reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealProgress {
    Continuing,
    /// The reveal finished; the completed message must be committed once.
    Done(Message),
}

pub struct RenderPipeline {
    sanitizer: Arc<dyn Sanitizer>,
    transcript: Transcript,
    typing: Option<UnitId>,
    reveal: Option<ActiveReveal>,
    step_interval: Duration,
}

impl RenderPipeline {
    pub fn new(sanitizer: Arc<dyn Sanitizer>) -> Self {
        Self {
            sanitizer,
            transcript: Transcript::default(),
            typing: None,
            reveal: None,
            step_interval: DEFAULT_STEP_INTERVAL,
        }
    }

    pub fn with_step_interval(mut self, interval: Duration) -> Self {
        self.step_interval = interval;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    /// Add one message unit.
    pub fn render_message(&mut self, message: &Message) -> UnitId {
        let assistant = message.is_assistant();
        self.transcript.push(RenderedUnit {
            id: 0,
            kind: UnitKind::Message(message.role),
            avatar: assistant.then_some(ASSISTANT_AVATAR),
            align: if assistant {
                Alignment::Left
            } else {
                Alignment::Right
            },
            body: self.sanitizer.sanitize(&message.text),
            emotion: message.assistant_emotion().map(str::to_string),
            revealing: false,
        })
    }

    pub fn show_typing_indicator(&mut self) {
        if self.typing.is_some() {
            return;
        }
        let id = self.transcript.push(RenderedUnit {
            id: 0,
            kind: UnitKind::Typing,
            avatar: Some(ASSISTANT_AVATAR),
            align: Alignment::Left,
            body: String::new(),
            emotion: None,
            revealing: false,
        });
        self.typing = Some(id);
    }

    pub fn hide_typing_indicator(&mut self) {
        if let Some(id) = self.typing.take() {
            self.transcript.remove(id);
        }
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_some()
    }

    pub fn is_revealing(&self) -> bool {
        self.reveal.is_some()
    }

    /// Start revealing an assistant reply. A reveal already running is
    /// cancelled first.
    pub fn begin_reveal(&mut self, text: &str, emotion: &str, now: Instant) {
        self.cancel_reveal();
        self.hide_typing_indicator();
        let unit = self.transcript.push(RenderedUnit {
            id: 0,
            kind: UnitKind::Message(Role::Assistant),
            avatar: Some(ASSISTANT_AVATAR),
            align: Alignment::Left,
            body: String::new(),
            emotion: None,
            revealing: true,
        });
        self.reveal = Some(ActiveReveal {
            typewriter: Typewriter::new(text, emotion, self.step_interval, now),
            unit,
        });
    }

    /// Advance the reveal by exactly one step, regardless of time.
    pub fn advance_reveal(&mut self) -> Option<RevealProgress> {
        let active = self.reveal.as_mut()?;
        match active.typewriter.advance() {
            Step::Continuing(prefix) => {
                let body = self.sanitizer.sanitize(&format!("{}{}", prefix, CURSOR));
                let unit = active.unit;
                if let Some(u) = self.transcript.unit_mut(unit) {
                    u.body = body;
                }
                self.transcript.autoscroll();
                Some(RevealProgress::Continuing)
            }
            Step::Done => {
                let ActiveReveal { typewriter, unit } = self.reveal.take()?;
                let body = self.sanitizer.sanitize(typewriter.text());
                if let Some(u) = self.transcript.unit_mut(unit) {
                    u.body = body;
                    u.emotion = Some(typewriter.emotion().to_string());
                    u.revealing = false;
                }
                self.transcript.autoscroll();
                Some(RevealProgress::Done(Message::assistant(
                    typewriter.text(),
                    typewriter.emotion(),
                )))
            }
        }
    }

    /// Run every step that is due at `now`. Returns the completed message if
    /// the reveal finished.
    pub fn tick(&mut self, now: Instant) -> Option<Message> {
        loop {
            let due = self
                .reveal
                .as_ref()
                .is_some_and(|r| r.typewriter.is_due(now));
            if !due {
                return None;
            }
            if let Some(RevealProgress::Done(message)) = self.advance_reveal() {
                return Some(message);
            }
        }
    }

    /// Earliest instant at which [`RenderPipeline::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.reveal.as_ref().map(|r| r.typewriter.next_due())
    }

    /// Stop the running reveal and discard its partial unit. Nothing is
    /// committed.
    pub fn cancel_reveal(&mut self) -> bool {
        match self.reveal.take() {
            Some(active) => {
                debug!(
                    "reveal cancelled after {}/{} steps",
                    active.typewriter.revealed_steps(),
                    active.typewriter.total_steps()
                );
                self.transcript.remove(active.unit);
                true
            }
            None => false,
        }
    }

    /// Rebuild the transcript from scratch.
    pub fn full_redraw(&mut self, messages: &[Message]) {
        self.cancel_reveal();
        self.typing = None;
        self.transcript.clear();
        for message in messages {
            self.render_message(message);
        }
    }

    pub fn apply_mood(&mut self, change: &MoodChange) {
        self.transcript.apply_mood(change);
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("units", &self.transcript.len())
            .field("typing", &self.typing)
            .field("revealing", &self.reveal.is_some())
            .finish()
    }
}
