//! Error tests
//!
//! Tests that every error code serializes to its wire name and that errors
//! render as `[CODE] message`.

use proptest::prelude::*;

use crate::{RouterError, RouterErrorCode};

fn error_code_strategy() -> impl Strategy<Value = RouterErrorCode> {
    prop_oneof![
        Just(RouterErrorCode::NotFound),
        Just(RouterErrorCode::Middleware),
        Just(RouterErrorCode::NodeNotFound),
        Just(RouterErrorCode::InvalidConfig),
        Just(RouterErrorCode::LoaderFailed),
        Just(RouterErrorCode::NotStarted),
        Just(RouterErrorCode::Internal),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_error_display_format(code in error_code_strategy(), message in "[a-zA-Z0-9 ]{1,40}") {
        let error = RouterError::new(code, message.clone());
        prop_assert_eq!(error.to_string(), format!("[{}] {}", code.as_str(), message));
    }

    #[test]
    fn prop_error_code_serializes_to_as_str(code in error_code_strategy()) {
        let json = serde_json::to_value(code).unwrap();
        prop_assert_eq!(json.clone(), serde_json::Value::String(code.as_str().to_string()));

        let back: RouterErrorCode = serde_json::from_value(json).unwrap();
        prop_assert_eq!(back, code);
    }
}

#[test]
fn test_constructors() {
    let error = RouterError::not_found("/missing");
    assert!(error.is_not_found());
    assert_eq!(error.to_string(), "[NOT_FOUND] No route matched '/missing'");
    assert!(error.matched.is_empty());

    assert_eq!(RouterError::node_not_found("node_1").code, RouterErrorCode::NodeNotFound);
    assert_eq!(RouterError::not_started().code, RouterErrorCode::NotStarted);
    assert_eq!(RouterError::loader_failed("boom").code, RouterErrorCode::LoaderFailed);

    let error = RouterError::middleware("guard failed").with_cause("timeout");
    assert_eq!(error.cause.as_deref(), Some("timeout"));
    assert!(!error.code.is_client_error());
    assert!(RouterErrorCode::InvalidConfig.is_client_error());
}

#[test]
fn test_from_json_error() {
    let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: RouterError = err.into();
    assert_eq!(error.code, RouterErrorCode::InvalidConfig);
    assert!(error.message.starts_with("JSON error"));
}
