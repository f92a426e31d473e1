//! Tests for CLI error mapping and user-facing messages

use super::error::{CliError, Result};
use crate::core::{AuthenticationError, Error, TransportError};
use std::io;

#[test]
fn test_error_creation_helpers() {
    match CliError::configuration("bad toml") {
        CliError::Configuration(msg) => assert_eq!(msg, "bad toml"),
        other => panic!("Expected Configuration error, got {:?}", other),
    }
    match CliError::invalid_input("window must be positive") {
        CliError::InvalidInput(msg) => assert_eq!(msg, "window must be positive"),
        other => panic!("Expected InvalidInput error, got {:?}", other),
    }
    match CliError::export("path escapes output directory") {
        CliError::Export(msg) => assert_eq!(msg, "path escapes output directory"),
        other => panic!("Expected Export error, got {:?}", other),
    }
}

#[test]
fn test_error_type_conversions() {
    let err: CliError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
    assert!(matches!(err, CliError::Io(_)));

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: CliError = json_err.into();
    assert!(matches!(err, CliError::Serialization(_)));

    let err: CliError = Error::Cancelled.into();
    assert!(matches!(err, CliError::Sdk(Error::Cancelled)));
}

#[test]
fn test_retry_logic() {
    assert!(CliError::Io(io::Error::new(io::ErrorKind::Interrupted, "x")).is_retryable());
    assert!(CliError::Sdk(Error::Transport(TransportError::Timeout)).is_retryable());
    assert!(!CliError::Sdk(Error::from(AuthenticationError::rejected(401, ""))).is_retryable());
    assert!(!CliError::MissingPassword("ARIA_PASSWORD").is_retryable());
    assert!(!CliError::configuration("x").is_retryable());
}

#[test]
fn test_user_friendly_messages() {
    let msg = CliError::MissingPassword("ARIA_PASSWORD").user_message();
    assert!(msg.contains("ARIA_PASSWORD"));
    assert!(msg.contains("never read from the config file"));

    let msg = CliError::configuration("timeout_secs must be greater than zero").user_message();
    assert!(msg.contains("config show"));

    let msg = CliError::Sdk(Error::from(AuthenticationError::rejected(401, "nope"))).user_message();
    assert!(msg.contains("Login was refused"));

    let msg = CliError::invalid_input("bad").user_message();
    assert_eq!(msg, "Invalid input: bad");
}

#[test]
fn test_result_type_alias() {
    fn fails() -> Result<()> {
        Err(CliError::export("nope"))
    }
    assert!(fails().is_err());
}
