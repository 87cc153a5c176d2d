use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(LuminaError::decode("x").to_string().contains("decode error:"));
    assert!(
        LuminaError::invalid_input("x")
            .to_string()
            .contains("invalid input:")
    );
    assert!(
        LuminaError::persist("x")
            .to_string()
            .contains("persist error:")
    );
    assert!(
        LuminaError::invalid_state("x")
            .to_string()
            .contains("invalid state:")
    );
    assert!(LuminaError::config("x").to_string().contains("config error:"));
    assert!(LuminaError::cancelled("x").to_string().contains("cancelled:"));
    assert!(
        LuminaError::history("x")
            .to_string()
            .contains("history error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = LuminaError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_cancelled_reports_cancellation() {
    assert!(LuminaError::cancelled("stop").is_cancelled());
    assert!(!LuminaError::persist("disk").is_cancelled());
}
