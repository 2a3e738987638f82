//! Change notifications.
//!
//! Edits never call observers directly: they record [`Notices`] while the model's lock
//! is held, and the caller dispatches them once every lock has been released. An
//! observer may therefore read from (or even edit) the model that notified it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::foundation::core::Time;
use crate::foundation::sync;

/// Inclusive span of positions whose value may have changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeRange {
    pub start: Time,
    pub end: Time,
}

impl ChangeRange {
    pub fn at(position: Time) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Range covering both positions, in either order.
    pub fn between(a: Time, b: Time) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

pub type ChangeCallback = Arc<dyn Fn(ChangeRange) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

#[derive(Default)]
pub struct Observers {
    next_id: AtomicU64,
    callbacks: RwLock<Vec<(ObserverId, ChangeCallback)>>,
}

impl Observers {
    pub fn subscribe(&self, callback: ChangeCallback) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        sync::write(&self.callbacks).push((id, callback));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut callbacks = sync::write(&self.callbacks);
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        sync::read(&self.callbacks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, range: ChangeRange) {
        let snapshot: Vec<ChangeCallback> = sync::read(&self.callbacks)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in snapshot {
            cb(range);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribed", &self.len())
            .finish()
    }
}

/// Notifications waiting for their locks to be released.
#[derive(Default)]
pub struct Notices {
    pending: Vec<(Weak<Observers>, ChangeRange)>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `range` for `target`, merging with the previous entry when it targets the
    /// same observers.
    pub fn push(&mut self, target: &Arc<Observers>, range: ChangeRange) {
        if let Some((last, last_range)) = self.pending.last_mut()
            && std::ptr::eq(last.as_ptr(), Arc::as_ptr(target))
        {
            *last_range = last_range.union(range);
            return;
        }
        self.pending.push((Arc::downgrade(target), range));
    }

    pub fn append(&mut self, other: Notices) {
        self.pending.extend(other.pending);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Deliver every queued notification. Targets that have been dropped are skipped.
    pub fn dispatch(self) {
        for (target, range) in self.pending {
            if let Some(observers) = target.upgrade() {
                observers.notify(range);
            }
        }
    }
}

impl fmt::Debug for Notices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notices")
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transaction/notify.rs"]
mod tests;
