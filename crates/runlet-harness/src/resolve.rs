//! Result Resolver & Emitter.
//!
//! Precedence, first match wins:
//! 1. a binding named `result` left by the script,
//! 2. a binding named `__return__`,
//! 3. the script's explicit return value,
//! 4. nothing — silent success.
//!
//! An unrepresentable value (function, cycle, non-finite number) is a
//! contained fault: the script may already have produced useful output via
//! `print`, so the emitter logs and stays silent rather than failing the
//! invocation.

use std::io::Write;

use runlet_script::Value;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::error::Result;

/// Pick the invocation's single result value, if any.
pub fn resolve(ctx: &ExecutionContext, returned: Option<Value>) -> Option<Value> {
    ctx.lookup("result")
        .or_else(|| ctx.lookup("__return__"))
        .or(returned)
}

/// Serialize the resolved result as one JSON line on `out`. Serialization
/// faults are swallowed; write faults are not.
pub fn emit(value: &Value, out: &mut dyn Write) -> Result<()> {
    match value.to_json() {
        Ok(json) => {
            writeln!(out, "{json}")?;
        }
        Err(reason) => {
            debug!(%reason, "result not emitted");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{compile, invoke};
    use serde_json::json;

    fn run(code: &str, input: serde_json::Value) -> (Option<Value>, ExecutionContext) {
        let ctx = ExecutionContext::new(&input);
        let program = compile(code).unwrap();
        let mut out = Vec::new();
        let returned = invoke(&program, &ctx, &mut out).unwrap();
        (returned, ctx)
    }

    #[test]
    fn test_result_binding_beats_return_value() {
        let (returned, ctx) = run("result = 1\nreturn 2", json!({}));
        let resolved = resolve(&ctx, returned).unwrap();
        assert_eq!(resolved, Value::Num(1.0));
    }

    #[test]
    fn test_dunder_return_beats_return_value() {
        let (returned, ctx) = run("__return__ = 1\nreturn 2", json!({}));
        let resolved = resolve(&ctx, returned).unwrap();
        assert_eq!(resolved, Value::Num(1.0));
    }

    #[test]
    fn test_result_beats_dunder_return() {
        let (returned, ctx) = run("__return__ = 1\nresult = 2", json!({}));
        let resolved = resolve(&ctx, returned).unwrap();
        assert_eq!(resolved, Value::Num(2.0));
    }

    #[test]
    fn test_return_value_used_when_no_bindings() {
        let (returned, ctx) = run("return 3", json!({}));
        let resolved = resolve(&ctx, returned).unwrap();
        assert_eq!(resolved, Value::Num(3.0));
    }

    #[test]
    fn test_no_candidate_resolves_to_none() {
        let (returned, ctx) = run("x = 1", json!({}));
        assert!(resolve(&ctx, returned).is_none());
    }

    #[test]
    fn test_explicit_return_null_is_a_candidate() {
        let (returned, ctx) = run("return null", json!({}));
        assert_eq!(resolve(&ctx, returned), Some(Value::Null));
    }

    #[test]
    fn test_emit_writes_one_json_line() {
        let mut out = Vec::new();
        emit(&Value::Str("hi".into()), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"hi\"\n");
    }

    #[test]
    fn test_emit_swallows_unrepresentable() {
        let (returned, ctx) = run("return fn() { return 1 }", json!({}));
        let resolved = resolve(&ctx, returned).unwrap();
        let mut out = Vec::new();
        emit(&resolved, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
