use super::*;

#[test]
fn rect_lerp_is_component_wise() {
    let a = RectValue::new(0.0, 0.0, 100.0, 50.0);
    let b = RectValue::new(10.0, 20.0, 200.0, 150.0).with_opacity(0.0);
    let mid = RectValue::lerp(&a, &b, 0.5);
    assert_eq!(mid, RectValue::new(5.0, 10.0, 150.0, 100.0).with_opacity(0.5));
}

#[test]
fn catmull_rom_passes_through_control_points() {
    assert_eq!(catmull_rom(0.0, 1.0, 2.0, 3.0, 0.0), 1.0);
    assert_eq!(catmull_rom(0.0, 1.0, 2.0, 3.0, 1.0), 2.0);
    // collinear points give a straight line
    assert!((catmull_rom(0.0, 1.0, 2.0, 3.0, 0.25) - 1.25).abs() < 1e-12);
}

#[test]
fn rect_text_accepts_optional_opacity() {
    let r = RectValue::parse_text("1 2 3 4").unwrap();
    assert_eq!(r, RectValue::new(1.0, 2.0, 3.0, 4.0));
    let r = RectValue::parse_text(" 1 2 3 4 0.5 ").unwrap();
    assert_eq!(r.opacity, 0.5);
    assert!(RectValue::parse_text("1 2 3").is_none());
    assert!(RectValue::parse_text("1 2 3 4 5 6").is_none());
    assert!(RectValue::parse_text("1 2 x 4").is_none());
}

#[test]
fn rect_text_omits_opacity_on_request() {
    let r = RectValue::new(1.0, 2.5, 3.0, 4.0).with_opacity(0.25);
    assert_eq!(r.write_text(true), "1 2.5 3 4 0.25");
    assert_eq!(r.write_text(false), "1 2.5 3 4");
}

#[test]
fn scalar_text_rejects_non_finite() {
    assert_eq!(f64::parse_text(" 12.5"), Some(12.5));
    assert!(f64::parse_text("nan").is_none());
    assert!(f64::parse_text("inf").is_none());
    assert_eq!(100.0f64.write_text(true), "100");
}

#[test]
fn recentering_keeps_size_and_opacity() {
    let r = RectValue::new(0.0, 0.0, 100.0, 40.0).with_opacity(0.3);
    assert_eq!(r.center(), Point::new(50.0, 20.0));
    let moved = r.recentered(Point::new(200.0, 200.0));
    assert_eq!(moved, RectValue::new(150.0, 180.0, 100.0, 40.0).with_opacity(0.3));
}

#[test]
fn tagged_value_converts_by_shape() {
    let v = 2.0f64.into_value();
    assert_eq!(v.shape(), ValueShape::Scalar);
    assert_eq!(f64::from_value(v), Some(2.0));
    assert_eq!(RectValue::from_value(v), None);
    assert_eq!(ValueShape::Rect.to_string(), "rect");
}
