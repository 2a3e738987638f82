use std::sync::Arc;

use super::*;
use crate::animation::value::RectValue;
use crate::transaction::undo::UndoStack;

fn scalar_track() -> Box<dyn KeyframeTrack> {
    Box::new(KeyframeModel::new(0.0, Arc::new(UndoStack::new())))
}

fn rect_track() -> Box<dyn KeyframeTrack> {
    Box::new(KeyframeModel::new(
        RectValue::new(0.0, 0.0, 10.0, 10.0),
        Arc::new(UndoStack::new()),
    ))
}

fn at(frame: i64) -> Time {
    Time::new(frame, Default::default())
}

#[test]
fn shape_follows_value_type() {
    assert_eq!(scalar_track().shape(), ValueShape::Scalar);
    assert_eq!(rect_track().shape(), ValueShape::Rect);
}

#[test]
fn value_of_wrong_shape_is_rejected() {
    let track = scalar_track();
    let mut tx = Transaction::new();
    let rect = Value::Rect(RectValue::new(1.0, 1.0, 1.0, 1.0));
    assert!(!track.add_value_with(at(10), KeyframeKind::Linear, rect, &mut tx));
    assert!(!track.update_value_with(at(0), rect, &mut tx));
    assert!(tx.is_empty());
    assert_eq!(track.len(), 1);

    assert!(track.add_value_with(at(10), KeyframeKind::Linear, Value::Scalar(4.0), &mut tx));
    assert_eq!(tx.len(), 1);
    assert_eq!(track.value_at(at(10)), Value::Scalar(4.0));
}

#[test]
fn marks_and_navigation() {
    let track = scalar_track();
    let mut tx = Transaction::new();
    assert!(track.add_value_with(at(10), KeyframeKind::Smooth, Value::Scalar(1.0), &mut tx));
    assert_eq!(track.mark(at(10)).map(|m| m.kind), Some(KeyframeKind::Smooth));
    assert_eq!(track.next_mark(at(0)).map(|m| m.position), Some(at(10)));
    assert_eq!(track.prev_mark(at(10)).map(|m| m.position), Some(at(0)));
    assert_eq!(track.closest_mark(at(8)).map(|m| m.position), Some(at(10)));
    assert_eq!(track.mark(at(3)), None);
}

#[test]
fn preview_does_not_touch_track() {
    let track = scalar_track();
    assert_eq!(track.preview_positions("5=1;9=2"), vec![at(0), at(5), at(9)]);
    assert_eq!(track.positions(), vec![at(0)]);
    assert_eq!(track.serialize(), "0=0");
}

#[test]
fn interpolated_add_uses_current_value() {
    let track = scalar_track();
    let mut tx = Transaction::new();
    assert!(track.add_value_with(at(20), KeyframeKind::Linear, Value::Scalar(20.0), &mut tx));
    assert!(track.add_interpolated_with(at(5), KeyframeKind::Linear, &mut tx));
    assert_eq!(track.value_at(at(5)), Value::Scalar(5.0));
    assert!(!track.is_bound());
}
