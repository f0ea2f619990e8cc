use rlora_core::errors::{AggError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("path", "data/Aloha/300m/run.txt")
        .with_context("reason", "example")
}

#[test]
fn filename_error_surface() {
    let err = AggError::FilenamePatternMismatch(sample_info("F001", "bad name"));
    assert_eq!(err.info().code, "F001");
    assert!(err.info().context.contains_key("path"));
    assert!(err.is_data_error());
}

#[test]
fn label_error_surface() {
    let err = AggError::MissingLabel(sample_info("L001", "label missing"));
    assert_eq!(err.info().code, "L001");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn zero_denominator_surface() {
    let err = AggError::ZeroDenominator(sample_info("Z001", "divide by zero"));
    assert_eq!(err.info().code, "Z001");
    assert!(err.is_data_error());
}

#[test]
fn io_errors_are_not_data_errors() {
    let err = AggError::Io(sample_info("IO01", "disk full"));
    assert!(!err.is_data_error());
    let err = AggError::Config(sample_info("C001", "bad list"));
    assert!(!err.is_data_error());
}

#[test]
fn context_is_added_without_changing_family() {
    let err = AggError::NonNumericValue(ErrorInfo::new("N001", "not a number"))
        .with_context("path", "x.txt");
    assert!(matches!(err, AggError::NonNumericValue(_)));
    assert_eq!(err.info().context.get("path").map(String::as_str), Some("x.txt"));
}

#[test]
fn display_includes_code_context_and_hint() {
    let err = AggError::MalformedDocument(
        ErrorInfo::new("M001", "results missing")
            .with_context("path", "a.json")
            .with_hint("run `rlora flatten` first"),
    );
    let text = err.to_string();
    assert!(text.starts_with("malformed document: results missing (code: M001)"));
    assert!(text.contains("path=a.json"));
    assert!(text.contains("hint: run `rlora flatten` first"));
}

#[test]
fn errors_round_trip_through_json() {
    let err = AggError::EmptySampleSet(sample_info("E001", "no values"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"EmptySampleSet\""));
    let back: AggError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, err);
}
