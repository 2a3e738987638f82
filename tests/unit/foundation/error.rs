use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        KeyframeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(KeyframeError::parse("x").to_string().contains("parse error:"));
    assert!(
        KeyframeError::consistency("x")
            .to_string()
            .contains("consistency error:")
    );
    assert!(
        KeyframeError::transaction("x")
            .to_string()
            .contains("transaction error:")
    );
    assert!(
        KeyframeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = KeyframeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
