//! Accepted-line history with a recall cursor.

use trellis_types::error::Result;

/// Append-only log of accepted lines plus a recall position.
///
/// The position always points at an existing entry (or nothing, while the
/// log is empty) and snaps back to the newest entry on every append.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
    position: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and reset the recall cursor to the newest entry.
    pub fn append(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
        self.reset();
    }

    /// Move the recall cursor back to the newest entry.
    pub fn reset(&mut self) {
        self.position = self.entries.len().saturating_sub(1);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at an absolute 0-based index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Current recall index, if there is any history.
    pub fn position(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.position)
    }

    /// Whether the recall cursor sits on the newest entry.
    pub fn at_last(&self) -> bool {
        self.entries.is_empty() || self.position + 1 == self.entries.len()
    }

    /// Entry under the recall cursor.
    pub fn current(&self) -> Option<&str> {
        self.get(self.position)
    }

    /// Step toward the oldest entry (clamped at 0) and return it.
    pub fn backward(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        self.position = self.position.saturating_sub(1);
        self.current()
    }

    /// Step toward the newest entry.
    ///
    /// Returns `None` when already on the newest entry so the caller can
    /// clear its buffer instead.
    pub fn forward(&mut self) -> Option<&str> {
        if self.at_last() {
            return None;
        }
        self.position += 1;
        self.current()
    }

    /// First entry containing `needle`, scanning newest first.
    pub fn complete_backward(&self, needle: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|line| line.contains(needle))
            .map(String::as_str)
    }

    /// First entry containing `needle`, scanning oldest first.
    pub fn complete_forward(&self, needle: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|line| line.contains(needle))
            .map(String::as_str)
    }

    /// Most recent entry starting with `prefix`.
    pub fn find_prefix(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|line| line.starts_with(prefix))
            .map(String::as_str)
    }
}

/// Persistence for accepted lines, owned by the embedding process.
///
/// Lines are reloaded once when a session starts and appended as they are
/// accepted.
pub trait HistoryStore: Send {
    /// Previously stored lines, oldest first.
    fn load(&mut self) -> Result<Vec<String>>;

    /// Record one accepted line.
    fn append(&mut self, line: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> History {
        let mut h = History::new();
        h.append("foo");
        h.append("bar");
        h.append("biz");
        h
    }

    #[test]
    fn empty_history_navigation_is_noop() {
        let mut h = History::new();
        assert!(h.is_empty());
        assert_eq!(h.position(), None);
        assert_eq!(h.current(), None);
        assert_eq!(h.backward(), None);
        assert_eq!(h.forward(), None);
        assert_eq!(h.complete_backward("x"), None);
        assert_eq!(h.complete_forward("x"), None);
    }

    #[test]
    fn current_is_newest_after_append() {
        let h = sample();
        assert_eq!(h.len(), 3);
        assert_eq!(h.current(), Some("biz"));
        assert_eq!(h.position(), Some(2));
    }

    #[test]
    fn backward_returns_previous_entry() {
        let mut h = sample();
        assert_eq!(h.backward(), Some("bar"));
        assert_eq!(h.backward(), Some("foo"));
        assert_eq!(h.backward(), Some("foo"));
    }

    #[test]
    fn backward_with_single_entry_returns_it() {
        let mut h = History::new();
        h.append("only");
        assert_eq!(h.backward(), Some("only"));
    }

    #[test]
    fn forward_after_backward() {
        let mut h = sample();
        h.backward();
        assert_eq!(h.forward(), Some("biz"));
    }

    #[test]
    fn forward_at_last_signals_none() {
        let mut h = sample();
        assert!(h.at_last());
        assert_eq!(h.forward(), None);
        assert_eq!(h.position(), Some(2));
    }

    #[test]
    fn append_resets_cursor() {
        let mut h = sample();
        h.backward();
        h.backward();
        h.append("new");
        assert_eq!(h.current(), Some("new"));
        assert!(h.at_last());
    }

    #[test]
    fn reset_moves_to_newest() {
        let mut h = sample();
        h.backward();
        h.reset();
        assert_eq!(h.current(), Some("biz"));
    }

    #[test]
    fn substring_search_directions() {
        let h = sample();
        assert_eq!(h.complete_backward("b"), Some("biz"));
        assert_eq!(h.complete_forward("b"), Some("bar"));
        assert_eq!(h.complete_forward("oo"), Some("foo"));
        assert_eq!(h.complete_backward("zz"), None);
    }

    #[test]
    fn prefix_search_prefers_most_recent() {
        let mut h = sample();
        h.append("bar baz");
        assert_eq!(h.find_prefix("ba"), Some("bar baz"));
        assert_eq!(h.find_prefix("f"), Some("foo"));
        assert_eq!(h.find_prefix("q"), None);
    }

    #[test]
    fn absolute_index() {
        let h = sample();
        assert_eq!(h.get(0), Some("foo"));
        assert_eq!(h.get(3), None);
        assert_eq!(h.entries().len(), 3);
    }
}
