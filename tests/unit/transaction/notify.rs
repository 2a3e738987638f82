use std::sync::Mutex;

use super::*;
use crate::foundation::core::Fps;

fn t(frame: i64) -> Time {
    Time::new(frame, Fps::default())
}

fn recorder(observers: &Observers) -> (ObserverId, Arc<Mutex<Vec<ChangeRange>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = observers.subscribe(Arc::new(move |r| sink.lock().unwrap().push(r)));
    (id, seen)
}

#[test]
fn ranges_union_and_order() {
    let r = ChangeRange::between(t(30), t(10));
    assert_eq!(r.start, t(10));
    assert_eq!(r.end, t(30));
    let u = r.union(ChangeRange::at(t(50)));
    assert_eq!(u, ChangeRange::between(t(10), t(50)));
}

#[test]
fn unsubscribed_callbacks_stop_receiving() {
    let observers = Observers::default();
    let (id, seen) = recorder(&observers);
    observers.notify(ChangeRange::at(t(1)));
    assert!(observers.unsubscribe(id));
    assert!(!observers.unsubscribe(id));
    observers.notify(ChangeRange::at(t(2)));
    assert_eq!(seen.lock().unwrap().as_slice(), &[ChangeRange::at(t(1))]);
    assert!(observers.is_empty());
}

#[test]
fn consecutive_notices_for_one_target_merge() {
    let a = Arc::new(Observers::default());
    let b = Arc::new(Observers::default());
    let (_, seen_a) = recorder(&a);
    let (_, seen_b) = recorder(&b);

    let mut notices = Notices::new();
    notices.push(&a, ChangeRange::at(t(10)));
    notices.push(&a, ChangeRange::at(t(40)));
    notices.push(&b, ChangeRange::at(t(5)));
    notices.push(&a, ChangeRange::at(t(0)));
    assert_eq!(notices.len(), 3);

    notices.dispatch();
    assert_eq!(
        seen_a.lock().unwrap().as_slice(),
        &[ChangeRange::between(t(10), t(40)), ChangeRange::at(t(0))]
    );
    assert_eq!(seen_b.lock().unwrap().as_slice(), &[ChangeRange::at(t(5))]);
}

#[test]
fn dropped_targets_are_skipped() {
    let a = Arc::new(Observers::default());
    let mut notices = Notices::new();
    notices.push(&a, ChangeRange::at(t(1)));
    drop(a);
    notices.dispatch();
}

#[test]
fn observer_may_subscribe_during_notify() {
    let observers = Arc::new(Observers::default());
    let inner = Arc::clone(&observers);
    observers.subscribe(Arc::new(move |_| {
        inner.subscribe(Arc::new(|_| {}));
    }));
    observers.notify(ChangeRange::at(t(0)));
    assert_eq!(observers.len(), 2);
}
