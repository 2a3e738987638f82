use super::*;
use crate::foundation::core::Fps;

fn key(frame: i64, kind: KeyframeKind, value: f64) -> Keyframe<f64> {
    Keyframe::new(Time::new(frame, Fps::default()), kind, value)
}

fn at(frame: i64) -> Time {
    Time::new(frame, Fps::default())
}

#[test]
fn linear_interpolates_between_keys() {
    let a = key(0, KeyframeKind::Linear, 0.0);
    let b = key(50, KeyframeKind::Linear, 100.0);
    assert_eq!(interpolate(&a, &b, at(25)), 50.0);
    assert_eq!(interpolate(&a, &b, at(10)), 20.0);
}

#[test]
fn discrete_holds_until_next_key() {
    let a = key(0, KeyframeKind::Discrete, 1.0);
    let b = key(10, KeyframeKind::Linear, 3.0);
    assert_eq!(interpolate(&a, &b, at(9)), 1.0);
    let keys = [a, b];
    assert_eq!(value_at(&keys, at(9)), Some(1.0));
    assert_eq!(value_at(&keys, at(10)), Some(3.0));
}

#[test]
fn smooth_without_outer_neighbors_is_linear() {
    let keys = [
        key(0, KeyframeKind::Smooth, 0.0),
        key(10, KeyframeKind::Linear, 10.0),
    ];
    assert_eq!(value_at(&keys, at(3)), Some(3.0));
}

#[test]
fn smooth_uses_neighbors_for_tangents() {
    let keys = [
        key(0, KeyframeKind::Linear, 0.0),
        key(10, KeyframeKind::Smooth, 0.0),
        key(20, KeyframeKind::Linear, 10.0),
        key(30, KeyframeKind::Linear, 10.0),
    ];
    let v = value_at(&keys, at(15)).unwrap();
    assert!((v - 5.0).abs() < 1e-9);
    let early = value_at(&keys, at(12)).unwrap();
    let linear = 2.0;
    assert!(early < linear, "ease-in expected, got {early}");
}

#[test]
fn value_at_clamps_outside_range() {
    let keys = [
        key(10, KeyframeKind::Linear, 4.0),
        key(20, KeyframeKind::Linear, 8.0),
    ];
    assert_eq!(value_at(&keys, at(0)), Some(4.0));
    assert_eq!(value_at(&keys, at(500)), Some(8.0));
    assert_eq!(value_at::<f64>(&[], at(0)), None);
}

#[test]
fn progress_handles_mixed_frame_rates() {
    let a = key(0, KeyframeKind::Linear, 0.0);
    let b = key(50, KeyframeKind::Linear, 100.0);
    let seg = Segment::new(a.view(), b.view());
    let one_second_at_50 = Time::new(50, Fps::new(50, 1).unwrap());
    assert_eq!(seg.progress(one_second_at_50), 0.5);
}
