use std::fmt;
use std::sync::Mutex;

use crate::foundation::config::KeyframeSettings;
use crate::foundation::error::KeyframeResult;
use crate::foundation::sync;
use crate::transaction::notify::Notices;
use crate::transaction::step::Step;

struct UndoEntry {
    name: String,
    step: Box<dyn Step>,
}

#[derive(Default)]
struct UndoState {
    undo: Vec<UndoEntry>,
    redo: Vec<UndoEntry>,
}

/// History of named, committed transactions.
///
/// Undo and redo replay an entry while holding the stack lock, so a concurrent `push`
/// lands either before or after the whole replay. Notifications are delivered once the
/// lock has been released. Steps must not call back into the stack.
pub struct UndoStack {
    state: Mutex<UndoState>,
    limit: Option<usize>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(UndoState::default()),
            limit: None,
        }
    }

    /// Keep at most `limit` undo entries; the oldest are forgotten first.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            state: Mutex::new(UndoState::default()),
            limit: Some(limit.max(1)),
        }
    }

    pub fn from_settings(settings: &KeyframeSettings) -> Self {
        match settings.undo_limit {
            Some(limit) => Self::with_limit(limit),
            None => Self::new(),
        }
    }

    /// Record an already-applied step. Clears the redo history.
    pub fn push(&self, name: impl Into<String>, step: Box<dyn Step>) {
        let name = name.into();
        tracing::debug!(%name, "push undo entry");
        let mut state = sync::lock(&self.state);
        state.redo.clear();
        state.undo.push(UndoEntry { name, step });
        if let Some(limit) = self.limit
            && state.undo.len() > limit
        {
            let excess = state.undo.len() - limit;
            state.undo.drain(..excess);
        }
    }

    /// Revert the most recent entry. `Ok(false)` when there is nothing to undo.
    ///
    /// On failure the entry stays on the undo side and the error is returned.
    #[tracing::instrument(skip(self))]
    pub fn undo(&self) -> KeyframeResult<bool> {
        let mut notices = Notices::new();
        let result = {
            let mut state = sync::lock(&self.state);
            let Some(entry) = state.undo.pop() else {
                return Ok(false);
            };
            let result = entry.step.undo(&mut notices);
            match result {
                Ok(()) => state.redo.push(entry),
                Err(_) => state.undo.push(entry),
            }
            result
        };
        notices.dispatch();
        result.map(|()| true)
    }

    /// Re-apply the most recently undone entry. `Ok(false)` when there is nothing to redo.
    #[tracing::instrument(skip(self))]
    pub fn redo(&self) -> KeyframeResult<bool> {
        let mut notices = Notices::new();
        let result = {
            let mut state = sync::lock(&self.state);
            let Some(entry) = state.redo.pop() else {
                return Ok(false);
            };
            let result = entry.step.redo(&mut notices);
            match result {
                Ok(()) => state.undo.push(entry),
                Err(_) => state.redo.push(entry),
            }
            result
        };
        notices.dispatch();
        result.map(|()| true)
    }

    pub fn can_undo(&self) -> bool {
        !sync::lock(&self.state).undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !sync::lock(&self.state).redo.is_empty()
    }

    pub fn undo_name(&self) -> Option<String> {
        sync::lock(&self.state).undo.last().map(|e| e.name.clone())
    }

    pub fn redo_name(&self) -> Option<String> {
        sync::lock(&self.state).redo.last().map(|e| e.name.clone())
    }

    /// Number of entries that can be undone.
    pub fn len(&self) -> usize {
        sync::lock(&self.state).undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn redo_len(&self) -> usize {
        sync::lock(&self.state).redo.len()
    }

    pub fn clear(&self) {
        let mut state = sync::lock(&self.state);
        state.undo.clear();
        state.redo.clear();
    }
}

impl fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = sync::lock(&self.state);
        f.debug_struct("UndoStack")
            .field("undo", &state.undo.len())
            .field("redo", &state.redo.len())
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transaction/undo.rs"]
mod tests;
