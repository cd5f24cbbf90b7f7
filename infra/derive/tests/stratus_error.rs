use std::borrow::Cow;
use stratus_derive::stratus_error;

#[stratus_error]
pub enum ProbeError {
    #[error("Parse failure{}: {source}", format_context(.context))]
    Parse { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },

    #[error("Receiver missing{}: {message}", format_context(.context))]
    Missing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn parse(raw: &str) -> Result<u64, ProbeError> {
    Ok(raw.parse::<u64>()?)
}

#[test]
fn stratus_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/stratus_error_pass.rs");
    t.pass("tests/ui/stratus_error_unit_context.rs");
}

#[test]
fn source_conversion_and_context() {
    let err = parse("not-a-number").unwrap_err();
    assert_eq!(err.kind(), "Parse");
    assert!(err.context_str().is_none());

    let err = "x".parse::<u64>().context("reading receiver id").unwrap_err();
    assert_eq!(err.context_str(), Some("reading receiver id"));
    assert!(err.to_string().starts_with("Parse failure (reading receiver id)"));
}

#[test]
fn context_overrides_on_own_result() {
    let result: Result<(), ProbeError> =
        Err(ProbeError::Missing { message: "receiver 7".into(), context: None });
    let err = result.context("dispatch Ping").unwrap_err();
    assert_eq!(err.to_string(), "Receiver missing (dispatch Ping): receiver 7");
}

#[test]
fn internal_from_strings() {
    let a: ProbeError = "static fault".into();
    let b: ProbeError = String::from("owned fault").into();
    assert_eq!(a.kind(), "Internal");
    assert_eq!(b.to_string(), "Internal: owned fault");
}
