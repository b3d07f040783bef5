//! Shared library for stater version responders.
//!
//! Each responder binary (one per OS) wires a platform version probe into a
//! `VersionQueryResponder` and serves it on a channel. Call handling itself
//! is synchronous and stateless; the binaries own all transport concerns.

pub mod platform;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use stater::{CallError, MethodCall, MethodResult};

/// The platform-name literal and OS version string a responder reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformVersion {
    pub name: String,
    pub version: String,
}

impl PlatformVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// A single method handler. Plain closures implement this directly.
pub trait CallHandler: Send + Sync {
    fn call(&self, call: &MethodCall) -> MethodResult;
}

impl<F> CallHandler for F
where
    F: Fn(&MethodCall) -> MethodResult + Send + Sync,
{
    fn call(&self, call: &MethodCall) -> MethodResult {
        self(call)
    }
}

/// Dispatch table mapping method names to handlers.
///
/// A missing entry is the not-implemented branch; method names match
/// exactly, including case.
#[derive(Default)]
pub struct MethodTable {
    handlers: HashMap<String, Box<dyn CallHandler>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: impl Into<String>, handler: impl CallHandler + 'static) {
        self.handlers.insert(method.into(), Box::new(handler));
    }

    /// Advertised method names, sorted for stable output.
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.keys().cloned().collect();
        methods.sort();
        methods
    }

    pub fn dispatch(&self, call: &MethodCall) -> MethodResult {
        match self.handlers.get(&call.method) {
            Some(handler) => handler.call(call),
            None => Err(CallError::NotImplemented(call.method.clone())),
        }
    }
}

/// The version query responder: answers `getPlatformVersion` with
/// `"<PlatformName> <osVersionString>"` and nothing else.
///
/// The reply string is formatted once at construction, so repeated calls
/// return identical values.
pub struct VersionQueryResponder {
    platform: PlatformVersion,
    table: MethodTable,
}

impl VersionQueryResponder {
    /// The one recognized method name.
    pub const GET_PLATFORM_VERSION: &'static str = "getPlatformVersion";

    pub fn new(platform: PlatformVersion) -> Self {
        let reply = format!("{} {}", platform.name, platform.version);
        let mut table = MethodTable::new();
        table.register(
            Self::GET_PLATFORM_VERSION,
            move |_call: &MethodCall| -> MethodResult { Ok(reply.clone()) },
        );

        Self { platform, table }
    }

    /// Handle one call. Pure and total: every method name has a defined
    /// outcome, and handling has no side effects.
    pub fn handle(&self, call: &MethodCall) -> MethodResult {
        self.table.dispatch(call)
    }

    pub fn platform(&self) -> &PlatformVersion {
        &self.platform
    }

    pub fn methods(&self) -> Vec<String> {
        self.table.methods()
    }

    /// JSON self-description served over `DescribeResponder`.
    pub fn describe(&self, channel: &str) -> serde_json::Value {
        json!({
            "name": format!("{}-version", self.platform.name.to_lowercase()),
            "platform": self.platform.name,
            "channel": channel,
            "methods": self.methods(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responder() -> VersionQueryResponder {
        VersionQueryResponder::new(PlatformVersion::new("iOS", "17.4"))
    }

    #[test]
    fn get_platform_version_reports_name_and_version() {
        let value = responder()
            .handle(&MethodCall::new("getPlatformVersion"))
            .unwrap();
        assert_eq!(value, "iOS 17.4");
    }

    #[test]
    fn value_is_name_then_space_then_version() {
        let responder = VersionQueryResponder::new(PlatformVersion::new("Linux", "6.1.0-18-amd64"));
        let value = responder
            .handle(&MethodCall::new("getPlatformVersion"))
            .unwrap();

        let (name, version) = value.split_once(' ').unwrap();
        assert_eq!(name, "Linux");
        assert!(!version.is_empty());
    }

    #[test]
    fn unknown_methods_are_not_implemented() {
        let responder = responder();
        for method in ["ping", "foo", "", "GetPlatformVersion"] {
            let err = responder.handle(&MethodCall::new(method)).unwrap_err();
            assert_eq!(err, CallError::NotImplemented(method.to_string()));
        }
    }

    #[test]
    fn repeated_calls_yield_identical_values() {
        let responder = responder();
        let call = MethodCall::new("getPlatformVersion");

        let first = responder.handle(&call).unwrap();
        let second = responder.handle(&call).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn arguments_are_ignored() {
        let call = MethodCall::with_args("getPlatformVersion", json!({"verbose": true}));
        let value = responder().handle(&call).unwrap();
        assert_eq!(value, "iOS 17.4");
    }

    #[test]
    fn describe_lists_the_method_surface() {
        let description = responder().describe("stater");
        assert_eq!(description["platform"], "iOS");
        assert_eq!(description["channel"], "stater");
        assert_eq!(description["methods"][0], "getPlatformVersion");
    }
}
