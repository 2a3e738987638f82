use super::*;
use crate::foundation::core::Fps;

#[test]
fn operators_map_back_to_kinds() {
    for kind in KeyframeKind::ALL {
        let op = kind.operator();
        let prefix = &op[..op.len() - 1];
        assert_eq!(KeyframeKind::from_operator_prefix(prefix), Some(kind));
    }
    assert_eq!(KeyframeKind::from_operator_prefix("^"), None);
}

#[test]
fn default_kind_is_linear() {
    assert_eq!(KeyframeKind::default(), KeyframeKind::Linear);
    assert_eq!(KeyframeKind::Smooth.label(), "smooth");
}

#[test]
fn view_and_mark_share_position_and_kind() {
    let k = Keyframe::new(Time::new(12, Fps::default()), KeyframeKind::Discrete, 3.5);
    let v = k.view();
    assert_eq!(v.position.frame(), 12);
    assert_eq!(*v.value, 3.5);
    assert_eq!(v.into_keyframe(), k);

    let m = k.mark();
    assert_eq!(m.kind, KeyframeKind::Discrete);
    assert_eq!(m.position, k.position);
}

#[test]
fn kind_serializes_snake_case() {
    let s = serde_json::to_string(&KeyframeKind::Discrete).unwrap();
    assert_eq!(s, "\"discrete\"");
}
