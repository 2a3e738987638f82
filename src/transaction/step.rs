use std::fmt;
use std::sync::{RwLock, Weak};

use crate::foundation::error::{KeyframeError, KeyframeResult};
use crate::foundation::sync;
use crate::transaction::edit::Edit;
use crate::transaction::notify::Notices;
use crate::transaction::undo::UndoStack;

/// A recorded, replayable unit of work.
///
/// Both directions either succeed or leave the target as it was.
pub trait Step: Send + Sync + fmt::Debug {
    fn redo(&self, notices: &mut Notices) -> KeyframeResult<()>;

    fn undo(&self, notices: &mut Notices) -> KeyframeResult<()>;
}

/// Something that owns the state an [`Edit`] operates on, and knows how to lock it.
pub trait EditTarget<E: Edit>: Send + Sync {
    fn apply_edit(&self, edit: &E, notices: &mut Notices) -> KeyframeResult<()>;
}

/// An edit bound to its target through a weak handle, so the undo history never keeps a
/// model alive.
pub struct TargetedEdit<E, T> {
    target: Weak<T>,
    edit: E,
}

impl<E, T> TargetedEdit<E, T> {
    pub fn new(target: Weak<T>, edit: E) -> Self {
        Self { target, edit }
    }

    pub fn edit(&self) -> &E {
        &self.edit
    }
}

impl<E, T> TargetedEdit<E, T>
where
    E: Edit,
    T: EditTarget<E>,
{
    fn run(&self, edit: &E, notices: &mut Notices) -> KeyframeResult<()> {
        let target = self
            .target
            .upgrade()
            .ok_or_else(|| KeyframeError::transaction("edit target was dropped"))?;
        target.apply_edit(edit, notices)
    }
}

impl<E, T> Step for TargetedEdit<E, T>
where
    E: Edit,
    T: EditTarget<E> + 'static,
{
    fn redo(&self, notices: &mut Notices) -> KeyframeResult<()> {
        self.run(&self.edit, notices)
    }

    fn undo(&self, notices: &mut Notices) -> KeyframeResult<()> {
        self.run(&self.edit.invert(), notices)
    }
}

impl<E: fmt::Debug, T> fmt::Debug for TargetedEdit<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetedEdit")
            .field("edit", &self.edit)
            .field("alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// Ordered group of steps that have already been applied, plus the notifications they
/// produced.
///
/// Redo runs the steps in order and undo runs them in reverse. If a step fails half way,
/// the steps already replayed are reverted before the error is returned.
#[derive(Debug, Default)]
pub struct Transaction {
    steps: Vec<Box<dyn Step>>,
    notices: Notices,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: Box<dyn Step>) {
        self.steps.push(step);
    }

    /// Sequential composition: `other` runs after `self` on redo and before it on undo.
    pub fn append(&mut self, other: Transaction) {
        self.steps.extend(other.steps);
        self.notices.append(other.notices);
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    pub(crate) fn split_notices(&mut self) -> Notices {
        std::mem::take(&mut self.notices)
    }

    /// Revert every step and return all notices still owed to observers.
    ///
    /// Used when a composite edit fails after some of its members succeeded.
    pub fn rollback(mut self) -> Notices {
        let mut notices = self.split_notices();
        for step in self.steps.iter().rev() {
            if let Err(err) = step.undo(&mut notices) {
                tracing::error!(?step, %err, "rollback step failed");
            }
        }
        notices
    }

    /// Push the recorded steps to `undo` as one entry named `name`, then deliver the
    /// notices. Returns `false` (and pushes nothing) when no step was recorded.
    pub fn commit(mut self, undo: &UndoStack, name: &str) -> bool {
        let notices = self.split_notices();
        let pushed = if self.is_empty() {
            false
        } else {
            undo.push(name, Box::new(self));
            true
        };
        notices.dispatch();
        pushed
    }
}

impl Step for Transaction {
    fn redo(&self, notices: &mut Notices) -> KeyframeResult<()> {
        for (i, step) in self.steps.iter().enumerate() {
            if let Err(err) = step.redo(notices) {
                for done in self.steps[..i].iter().rev() {
                    if let Err(revert) = done.undo(notices) {
                        tracing::error!(step = ?done, %revert, "partial undo failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo(&self, notices: &mut Notices) -> KeyframeResult<()> {
        for (i, step) in self.steps.iter().enumerate().rev() {
            if let Err(err) = step.undo(notices) {
                for done in &self.steps[i + 1..] {
                    if let Err(revert) = done.redo(notices) {
                        tracing::error!(step = ?done, %revert, "partial redo failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Runs its inner steps while holding a write guard on `gate`, so readers that go through
/// the same lock never see the inner steps half applied.
pub struct GatedStep<G> {
    gate: Weak<RwLock<G>>,
    inner: Transaction,
}

impl<G: Send + Sync> GatedStep<G> {
    pub fn new(gate: Weak<RwLock<G>>, inner: Transaction) -> Self {
        Self { gate, inner }
    }

    fn with_gate(
        &self,
        notices: &mut Notices,
        f: impl FnOnce(&Transaction, &mut Notices) -> KeyframeResult<()>,
    ) -> KeyframeResult<()> {
        let gate = self
            .gate
            .upgrade()
            .ok_or_else(|| KeyframeError::transaction("gated target was dropped"))?;
        let _guard = sync::write(&gate);
        f(&self.inner, notices)
    }
}

impl<G: Send + Sync> Step for GatedStep<G> {
    fn redo(&self, notices: &mut Notices) -> KeyframeResult<()> {
        self.with_gate(notices, |inner, notices| inner.redo(notices))
    }

    fn undo(&self, notices: &mut Notices) -> KeyframeResult<()> {
        self.with_gate(notices, |inner, notices| inner.undo(notices))
    }
}

impl<G> fmt::Debug for GatedStep<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedStep")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transaction/step.rs"]
mod tests;
