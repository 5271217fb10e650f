//! Per-session mutable state shared with command handlers.

use std::collections::VecDeque;

use crate::history::History;

/// A recorded handler failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// The stage text that was being executed.
    pub command: String,
    /// Full failure detail, shown by `traceback`.
    pub detail: String,
}

/// Small ring of the most recent handler faults.
#[derive(Debug, Clone)]
pub struct FaultLog {
    faults: VecDeque<Fault>,
    capacity: usize,
}

impl FaultLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            faults: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a fault, evicting the oldest when full.
    pub fn record(&mut self, command: impl Into<String>, detail: impl Into<String>) {
        if self.faults.len() == self.capacity {
            self.faults.pop_front();
        }
        self.faults.push_back(Fault {
            command: command.into(),
            detail: detail.into(),
        });
    }

    /// The most recently recorded fault.
    pub fn latest(&self) -> Option<&Fault> {
        self.faults.back()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Faults oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Fault> {
        self.faults.iter()
    }
}

/// Everything one session owns apart from its edit buffer and section
/// cursor.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub history: History,
    pub faults: FaultLog,
    running: bool,
}

impl SessionState {
    pub fn new(traceback_depth: usize) -> Self {
        Self {
            history: History::new(),
            faults: FaultLog::new(traceback_depth),
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ask the session to end after the current pipeline.
    pub fn request_exit(&mut self) {
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_log_keeps_most_recent() {
        let mut log = FaultLog::new(2);
        log.record("a", "1");
        log.record("b", "2");
        log.record("c", "3");
        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().unwrap().command, "c");
        let commands: Vec<&str> = log.iter().map(|f| f.command.as_str()).collect();
        assert_eq!(commands, vec!["b", "c"]);
    }

    #[test]
    fn fault_log_zero_capacity_still_holds_one() {
        let mut log = FaultLog::new(0);
        log.record("x", "boom");
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().detail, "boom");
    }

    #[test]
    fn empty_fault_log() {
        let log = FaultLog::new(4);
        assert!(log.is_empty());
        assert!(log.latest().is_none());
    }

    #[test]
    fn session_exit_request() {
        let mut s = SessionState::new(4);
        assert!(s.is_running());
        s.request_exit();
        assert!(!s.is_running());
    }
}
