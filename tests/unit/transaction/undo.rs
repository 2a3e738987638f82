use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use super::*;
use crate::foundation::error::KeyframeError;

/// Adds `delta` to a shared counter on redo and subtracts it on undo.
#[derive(Debug)]
struct Bump {
    counter: Arc<AtomicI64>,
    delta: i64,
    broken: Arc<AtomicBool>,
}

impl Step for Bump {
    fn redo(&self, _notices: &mut Notices) -> KeyframeResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(KeyframeError::transaction("broken"));
        }
        self.counter.fetch_add(self.delta, Ordering::SeqCst);
        Ok(())
    }

    fn undo(&self, _notices: &mut Notices) -> KeyframeResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(KeyframeError::transaction("broken"));
        }
        self.counter.fetch_sub(self.delta, Ordering::SeqCst);
        Ok(())
    }
}

struct Fixture {
    counter: Arc<AtomicI64>,
    broken: Arc<AtomicBool>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            counter: Arc::new(AtomicI64::new(0)),
            broken: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Apply `delta` now and record it on `stack`.
    fn apply(&self, stack: &UndoStack, name: &str, delta: i64) {
        self.counter.fetch_add(delta, Ordering::SeqCst);
        stack.push(
            name,
            Box::new(Bump {
                counter: Arc::clone(&self.counter),
                delta,
                broken: Arc::clone(&self.broken),
            }),
        );
    }

    fn value(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[test]
fn undo_and_redo_walk_the_history() {
    let stack = UndoStack::new();
    let f = Fixture::new();
    f.apply(&stack, "one", 1);
    f.apply(&stack, "ten", 10);
    assert_eq!(f.value(), 11);
    assert_eq!(stack.undo_name().as_deref(), Some("ten"));

    assert!(stack.undo().unwrap());
    assert_eq!(f.value(), 1);
    assert_eq!(stack.redo_name().as_deref(), Some("ten"));

    assert!(stack.undo().unwrap());
    assert!(!stack.undo().unwrap());
    assert_eq!(f.value(), 0);

    assert!(stack.redo().unwrap());
    assert_eq!(f.value(), 1);
    assert!(stack.can_undo());
    assert!(stack.can_redo());
}

#[test]
fn push_clears_redo_history() {
    let stack = UndoStack::new();
    let f = Fixture::new();
    f.apply(&stack, "a", 1);
    stack.undo().unwrap();
    assert_eq!(stack.redo_len(), 1);
    f.apply(&stack, "b", 2);
    assert_eq!(stack.redo_len(), 0);
    assert!(!stack.redo().unwrap());
}

#[test]
fn limit_forgets_oldest_entries() {
    let stack = UndoStack::with_limit(2);
    let f = Fixture::new();
    for (name, d) in [("a", 1), ("b", 2), ("c", 4)] {
        f.apply(&stack, name, d);
    }
    assert_eq!(stack.len(), 2);
    stack.undo().unwrap();
    stack.undo().unwrap();
    assert!(!stack.undo().unwrap());
    assert_eq!(f.value(), 1);
}

#[test]
fn failed_undo_keeps_the_entry() {
    let stack = UndoStack::new();
    let f = Fixture::new();
    f.apply(&stack, "a", 3);
    f.broken.store(true, Ordering::SeqCst);
    assert!(stack.undo().is_err());
    assert_eq!(stack.len(), 1);
    assert_eq!(f.value(), 3);

    f.broken.store(false, Ordering::SeqCst);
    assert!(stack.undo().unwrap());
    assert_eq!(f.value(), 0);
}

#[test]
fn settings_limit_is_honoured() {
    let settings = KeyframeSettings {
        undo_limit: Some(1),
        ..KeyframeSettings::default()
    };
    let stack = UndoStack::from_settings(&settings);
    let f = Fixture::new();
    f.apply(&stack, "a", 1);
    f.apply(&stack, "b", 1);
    assert_eq!(stack.len(), 1);
    stack.clear();
    assert!(stack.is_empty());
}

/// Undo parks between two barriers so a test can act while it is running.
#[derive(Debug)]
struct Paused {
    started: Arc<Barrier>,
    release: Arc<Barrier>,
}

impl Step for Paused {
    fn redo(&self, _notices: &mut Notices) -> KeyframeResult<()> {
        Ok(())
    }

    fn undo(&self, _notices: &mut Notices) -> KeyframeResult<()> {
        self.started.wait();
        self.release.wait();
        Ok(())
    }
}

#[test]
fn push_waits_for_a_running_undo() {
    let stack = UndoStack::new();
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    stack.push(
        "slow",
        Box::new(Paused {
            started: Arc::clone(&started),
            release: Arc::clone(&release),
        }),
    );
    let f = Fixture::new();

    std::thread::scope(|s| {
        let undoing = s.spawn(|| stack.undo());
        started.wait();
        let pushing = s.spawn(|| f.apply(&stack, "edit", 1));
        std::thread::sleep(Duration::from_millis(50));
        release.wait();
        assert!(undoing.join().unwrap().unwrap());
        pushing.join().unwrap();
    });

    // The edit came after the undo, so nothing is left to redo.
    assert_eq!(stack.undo_name().as_deref(), Some("edit"));
    assert_eq!(stack.redo_len(), 0);
    assert_eq!(f.value(), 1);
}
