use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::foundation::core::{Fps, Time};
use crate::transaction::notify::{ChangeRange, Observers};

#[derive(Clone, Debug)]
struct AddN(i64);

impl Edit for AddN {
    type State = i64;

    fn apply(&self, state: &mut i64) -> KeyframeResult<ChangeRange> {
        *state += self.0;
        Ok(ChangeRange::at(Time::new(*state, Fps::default())))
    }

    fn invert(&self) -> Self {
        AddN(-self.0)
    }
}

#[derive(Default)]
struct Counter {
    value: Mutex<i64>,
    observers: Arc<Observers>,
}

impl EditTarget<AddN> for Counter {
    fn apply_edit(&self, edit: &AddN, notices: &mut Notices) -> KeyframeResult<()> {
        let range = edit.apply(&mut self.value.lock().unwrap())?;
        notices.push(&self.observers, range);
        Ok(())
    }
}

/// Appends its name to a shared log; redo fails while `fail` is set.
#[derive(Debug)]
struct Logged {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail: AtomicBool,
}

impl Logged {
    fn boxed(name: &'static str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Box<dyn Step> {
        Box::new(Self {
            name,
            log: Arc::clone(log),
            fail: AtomicBool::new(fail),
        })
    }
}

impl Step for Logged {
    fn redo(&self, _notices: &mut Notices) -> KeyframeResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(KeyframeError::transaction(format!("{} refused", self.name)));
        }
        self.log.lock().unwrap().push(format!("redo {}", self.name));
        Ok(())
    }

    fn undo(&self, _notices: &mut Notices) -> KeyframeResult<()> {
        self.log.lock().unwrap().push(format!("undo {}", self.name));
        Ok(())
    }
}

#[test]
fn targeted_edit_replays_and_reverts() {
    let counter = Arc::new(Counter::default());
    let step = TargetedEdit::new(Arc::downgrade(&counter), AddN(5));
    let mut notices = Notices::new();
    step.redo(&mut notices).unwrap();
    assert_eq!(*counter.value.lock().unwrap(), 5);
    step.undo(&mut notices).unwrap();
    assert_eq!(*counter.value.lock().unwrap(), 0);
    assert_eq!(notices.len(), 1);
}

#[test]
fn targeted_edit_fails_once_target_is_gone() {
    let counter = Arc::new(Counter::default());
    let step = TargetedEdit::new(Arc::downgrade(&counter), AddN(1));
    drop(counter);
    let err = step.redo(&mut Notices::new()).unwrap_err();
    assert!(err.to_string().contains("dropped"));
}

#[test]
fn failed_redo_reverts_already_replayed_steps() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut tx = Transaction::new();
    tx.push(Logged::boxed("a", &log, false));
    tx.push(Logged::boxed("b", &log, false));
    tx.push(Logged::boxed("c", &log, true));

    assert!(tx.redo(&mut Notices::new()).is_err());
    assert_eq!(
        log.lock().unwrap().as_slice(),
        &["redo a", "redo b", "undo b", "undo a"]
    );
}

#[test]
fn undo_runs_in_reverse_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut first = Transaction::new();
    first.push(Logged::boxed("a", &log, false));
    let mut second = Transaction::new();
    second.push(Logged::boxed("b", &log, false));
    first.append(second);
    assert_eq!(first.len(), 2);

    first.undo(&mut Notices::new()).unwrap();
    assert_eq!(log.lock().unwrap().as_slice(), &["undo b", "undo a"]);
}

#[test]
fn rollback_reverts_and_returns_pending_notices() {
    let counter = Arc::new(Counter::default());
    let mut tx = Transaction::new();
    for n in [1, 2, 3] {
        counter
            .apply_edit(&AddN(n), tx.notices_mut())
            .unwrap();
        tx.push(Box::new(TargetedEdit::new(Arc::downgrade(&counter), AddN(n))));
    }
    assert_eq!(*counter.value.lock().unwrap(), 6);
    let notices = tx.rollback();
    assert_eq!(*counter.value.lock().unwrap(), 0);
    assert!(!notices.is_empty());
}

#[test]
fn commit_skips_empty_transactions() {
    let undo = UndoStack::new();
    assert!(!Transaction::new().commit(&undo, "nothing"));
    assert!(undo.is_empty());

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut tx = Transaction::new();
    tx.push(Logged::boxed("a", &log, false));
    assert!(tx.commit(&undo, "something"));
    assert_eq!(undo.undo_name().as_deref(), Some("something"));
}

#[derive(Debug)]
struct GateCheck {
    gate: Arc<RwLock<()>>,
    blocked: Arc<AtomicBool>,
}

impl Step for GateCheck {
    fn redo(&self, _notices: &mut Notices) -> KeyframeResult<()> {
        self.blocked
            .store(self.gate.try_read().is_err(), Ordering::SeqCst);
        Ok(())
    }

    fn undo(&self, notices: &mut Notices) -> KeyframeResult<()> {
        self.redo(notices)
    }
}

#[test]
fn gated_step_holds_the_gate_while_replaying() {
    let gate = Arc::new(RwLock::new(()));
    let blocked = Arc::new(AtomicBool::new(false));
    let mut inner = Transaction::new();
    inner.push(Box::new(GateCheck {
        gate: Arc::clone(&gate),
        blocked: Arc::clone(&blocked),
    }));
    let step = GatedStep::new(Arc::downgrade(&gate), inner);

    step.redo(&mut Notices::new()).unwrap();
    assert!(blocked.load(Ordering::SeqCst));
    assert!(gate.try_read().is_ok());
}
