//! Saved-session list with client-side title filtering.
//!
//! The list is fetched once when the history view opens; every keystroke
//! re-filters the cached entries instead of asking the backend again.

use crate::types::SessionSummary;

#[derive(Debug, Clone, Default)]
pub struct HistoryBrowser {
    entries: Vec<SessionSummary>,
    query: String,
    selected: usize,
}

impl HistoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached list with a fresh fetch.
    pub fn set_entries(&mut self, entries: Vec<SessionSummary>) {
        self.entries = entries;
        self.clamp_selection();
    }

    pub fn entries(&self) -> &[SessionSummary] {
        &self.entries
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.selected = 0;
    }

    pub fn push_query(&mut self, c: char) {
        self.query.push(c);
        self.selected = 0;
    }

    pub fn pop_query(&mut self) {
        self.query.pop();
        self.selected = 0;
    }

    /// Entries whose title contains the query, case-insensitively.
    pub fn filtered(&self) -> Vec<&SessionSummary> {
        let needle = self.query.to_lowercase();
        self.entries
            .iter()
            .filter(|s| s.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&SessionSummary> {
        self.filtered().get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        let len = self.filtered().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.query.clear();
        self.selected = 0;
    }

    fn clamp_selection(&mut self) {
        let len = self.filtered().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}
