//! # Typewriter
//!
//! Incremental reveal of an assistant reply, one grapheme per step. The
//! stepper holds no timer of its own: whoever drives it decides when the next
//! step is due, and dropping it is a cancellation.

use std::time::{Duration, Instant};

use unicode_segmentation::UnicodeSegmentation;

/// Glyph shown after the revealed prefix while the reveal is running.
pub const CURSOR: char = '▌';

/// Default delay between two steps.
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(20);

/// Result of one [`Typewriter::advance`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// One more grapheme is visible; the payload is the revealed prefix.
    Continuing(String),
    /// Everything has been revealed.
    Done,
}

#[derive(Debug, Clone)]
pub struct Typewriter {
    text: String,
    emotion: String,
    /// Byte offset of the end of every grapheme.
    boundaries: Vec<usize>,
    revealed: usize,
    interval: Duration,
    next_due: Instant,
    finished: bool,
}

impl Typewriter {
    pub fn new(
        text: impl Into<String>,
        emotion: impl Into<String>,
        interval: Duration,
        now: Instant,
    ) -> Self {
        let text = text.into();
        let boundaries = text
            .grapheme_indices(true)
            .map(|(start, g)| start + g.len())
            .collect();
        Self {
            text,
            emotion: emotion.into(),
            boundaries,
            revealed: 0,
            interval,
            next_due: now,
            finished: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn emotion(&self) -> &str {
        &self.emotion
    }

    /// Number of steps a full reveal takes.
    pub fn total_steps(&self) -> usize {
        self.boundaries.len()
    }

    pub fn revealed_steps(&self) -> usize {
        self.revealed
    }

    pub fn is_due(&self, now: Instant) -> bool {
        !self.finished && now >= self.next_due
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Reveal one more grapheme, or report completion once all are visible.
    pub fn advance(&mut self) -> Step {
        if self.revealed >= self.boundaries.len() {
            self.finished = true;
            return Step::Done;
        }
        self.revealed += 1;
        self.next_due += self.interval;
        Step::Continuing(self.prefix().to_string())
    }

    /// Revealed part of the text, without cursor.
    pub fn prefix(&self) -> &str {
        match self.revealed {
            0 => "",
            n => &self.text[..self.boundaries[n - 1]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> (usize, Vec<String>) {
        let mut tw = Typewriter::new(text, "joy", DEFAULT_STEP_INTERVAL, Instant::now());
        let mut prefixes = Vec::new();
        loop {
            match tw.advance() {
                Step::Continuing(prefix) => prefixes.push(prefix),
                Step::Done => break,
            }
        }
        (prefixes.len(), prefixes)
    }

    #[test]
    fn test_one_step_per_grapheme() {
        let (steps, prefixes) = run("Hi!");
        assert_eq!(steps, 3);
        assert_eq!(prefixes, vec!["H", "Hi", "Hi!"]);
    }

    #[test]
    fn test_empty_text_completes_immediately() {
        let (steps, _) = run("");
        assert_eq!(steps, 0);
    }

    #[test]
    fn test_graphemes_not_bytes() {
        let (steps, prefixes) = run("e\u{301}🌱");
        assert_eq!(steps, 2);
        assert_eq!(prefixes[0], "e\u{301}");
    }

    #[test]
    fn test_schedule_advances_by_interval() {
        let start = Instant::now();
        let mut tw = Typewriter::new("ab", "neutral", Duration::from_millis(20), start);
        assert!(tw.is_due(start));
        tw.advance();
        assert!(!tw.is_due(start));
        assert!(tw.is_due(start + Duration::from_millis(20)));
        tw.advance();
        assert_eq!(tw.advance(), Step::Done);
        assert!(!tw.is_due(start + Duration::from_secs(10)));
    }
}
