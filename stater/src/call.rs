//! The call/result model exchanged over a channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// An inbound request: a method name plus optional untyped arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: None,
        }
    }

    pub fn with_args(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args: Some(args),
        }
    }
}

/// The only call-level failure kind: the method name was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("method not implemented: {0}")]
    NotImplemented(String),
}

/// Exactly one result is produced per call.
pub type MethodResult = std::result::Result<String, CallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_implemented_names_the_method() {
        let err = CallError::NotImplemented("ping".to_string());
        assert_eq!(err.to_string(), "method not implemented: ping");
    }

    #[test]
    fn args_are_optional() {
        let call = MethodCall::new("getPlatformVersion");
        assert!(call.args.is_none());

        let call = MethodCall::with_args("getPlatformVersion", serde_json::json!({"detail": true}));
        assert_eq!(call.args.unwrap()["detail"], true);
    }
}
