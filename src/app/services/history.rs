use std::collections::VecDeque;
use std::time::SystemTime;

use crate::app::domain::project::ProjectState;

/// Point-in-time copy of a project. Decoded images and their encoded sources
/// are shared with the live state, so a snapshot costs settings, not image
/// data.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    pub state: ProjectState,
    pub label: String,
    pub timestamp: SystemTime,
}

impl HistorySnapshot {
    fn new(state: &ProjectState, label: &str) -> Self {
        Self {
            state: state.clone(),
            label: label.to_string(),
            timestamp: SystemTime::now(),
        }
    }
}

/// Undo/redo over whole-project snapshots.
///
/// `present` is the most recently recorded state. `past` holds older states
/// (oldest first) and is capped at `max_history`; `future` holds undone
/// states (next redo first) and is emptied by every new record.
pub struct HistoryEngine {
    past: VecDeque<HistorySnapshot>,
    present: Option<HistorySnapshot>,
    future: VecDeque<HistorySnapshot>,
    max_history: usize,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(50)
    }
}

impl HistoryEngine {
    pub fn new(max_history: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: VecDeque::new(),
            max_history: max_history.max(1),
        }
    }

    /// Drop all history and start from `state`.
    pub fn reset(&mut self, state: &ProjectState) {
        self.clear();
        self.present = Some(HistorySnapshot::new(state, "Open project"));
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.present = None;
        self.future.clear();
    }

    /// Record `state` after a user action. Returns false when it matches the
    /// present state, in which case nothing changes.
    pub fn record(&mut self, state: &ProjectState, label: &str) -> bool {
        if let Some(present) = &self.present {
            if present.state.same_content(state) {
                return false;
            }
        }
        let snapshot = HistorySnapshot::new(state, label);
        if let Some(previous) = self.present.replace(snapshot) {
            self.past.push_back(previous);
        }
        while self.past.len() > self.max_history {
            self.past.pop_front();
        }
        self.future.clear();
        true
    }

    /// Step back one state and return it, or `None` when there is nothing
    /// older than the present.
    pub fn undo(&mut self) -> Option<&ProjectState> {
        let previous = self.past.pop_back()?;
        if let Some(current) = self.present.replace(previous) {
            self.future.push_front(current);
        }
        self.present.as_ref().map(|s| &s.state)
    }

    pub fn redo(&mut self) -> Option<&ProjectState> {
        let next = self.future.pop_front()?;
        if let Some(current) = self.present.replace(next) {
            self.past.push_back(current);
        }
        self.present.as_ref().map(|s| &s.state)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Label of the action an undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        if self.past.is_empty() {
            return None;
        }
        self.present.as_ref().map(|s| s.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.future.front().map(|s| s.label.as_str())
    }

    pub fn present(&self) -> Option<&ProjectState> {
        self.present.as_ref().map(|s| &s.state)
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}
