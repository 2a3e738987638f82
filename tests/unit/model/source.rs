use super::*;

#[test]
fn param_id_conversions_agree() {
    let a = ParamId::from("rect");
    let b = ParamId::from(String::from("rect"));
    assert_eq!(a, b);
    assert_eq!(a, ParamId::new("rect"));
    assert_eq!(a.as_str(), "rect");
    assert_eq!(a.to_string(), "rect");
}

#[test]
fn param_id_serializes_as_plain_string() {
    let json = serde_json::to_string(&ParamId::from("level")).unwrap();
    assert_eq!(json, "\"level\"");
    let back: ParamId = serde_json::from_str(&json).unwrap();
    assert_eq!(back.as_str(), "level");
}

#[test]
fn memory_source_counts_only_set_value() {
    let source = MemoryParameterSource::new().with_value("level", "0=1");
    source.insert("rect", "0=0 0 10 10");
    assert_eq!(source.write_count(), 0);
    assert_eq!(source.get("level").as_deref(), Some("0=1"));

    source.set_value(&ParamId::from("level"), "0=2".to_owned());
    assert_eq!(source.write_count(), 1);
    assert_eq!(
        source.value(&ParamId::from("level")).as_deref(),
        Some("0=2")
    );
    assert_eq!(source.get("missing"), None);
}
