//! Context Builder: decode the input document and expose it to user code.
//!
//! The decoded value is bound under both `event` and `input` so scripts may
//! use either name; the bindings alias the same value. A blank input
//! document defaults to `{}`, matching the platform calling convention.

use serde_json::Value as Json;

use runlet_script::{install_builtins, Scope, Value};

use crate::error::{HarnessError, Result};

/// Decode the raw input text, defaulting to an empty object when blank.
pub fn decode_input(raw: &str) -> Result<Json> {
    if raw.trim().is_empty() {
        return Ok(Json::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw).map_err(HarnessError::InputDecode)
}

/// The name bindings visible to user code during one invocation.
///
/// Owned and mutated by the Call Adapter while the script runs; read-only
/// for the Result Resolver afterwards.
#[derive(Debug)]
pub struct ExecutionContext {
    globals: Scope,
}

impl ExecutionContext {
    pub fn new(input: &Json) -> Self {
        let globals = Scope::root();
        install_builtins(&globals);
        let value = Value::from_json(input);
        globals.set("event", value.clone());
        globals.set("input", value);
        ExecutionContext { globals }
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    /// Read a binding left behind by the executed code.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.globals.get_local(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_input_defaults_to_empty_object() {
        assert_eq!(decode_input("").unwrap(), json!({}));
        assert_eq!(decode_input("  \n ").unwrap(), json!({}));
    }

    #[test]
    fn test_valid_input_decodes() {
        assert_eq!(decode_input(r#"{"a": [1, 2]}"#).unwrap(), json!({"a": [1, 2]}));
        assert_eq!(decode_input("42").unwrap(), json!(42));
        assert_eq!(decode_input("null").unwrap(), json!(null));
    }

    #[test]
    fn test_malformed_input_is_decode_fault() {
        let err = decode_input("{oops").unwrap_err();
        assert!(matches!(err, HarnessError::InputDecode(_)));
    }

    #[test]
    fn test_event_and_input_alias_same_value() {
        let ctx = ExecutionContext::new(&json!({"name": "Ada"}));
        let event = ctx.lookup("event").unwrap();
        let input = ctx.lookup("input").unwrap();
        assert_eq!(event, input);
    }

    #[test]
    fn test_result_binding_absent_initially() {
        let ctx = ExecutionContext::new(&json!({}));
        assert!(ctx.lookup("result").is_none());
        assert!(ctx.lookup("__return__").is_none());
    }
}
