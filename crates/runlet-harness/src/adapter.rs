//! Call Adapter: turn arbitrary source into one invocable unit and run it.
//!
//! The parser already treats a whole source file as the body of a
//! synthesized zero-argument callable, so a top-level `return` is legal.
//! Execution happens directly in the context's global scope: top-level
//! assignments persist as bindings the Result Resolver can see afterwards.

use std::io::Write;

use runlet_script::{Interp, Program, Value};
use tracing::debug;

use crate::context::ExecutionContext;
use crate::error::Result;

/// Parse source into a program. A failure here is a Construction Fault:
/// user code never ran.
pub fn compile(code: &str) -> Result<Program> {
    Ok(runlet_script::parse(code)?)
}

/// Execute a compiled program against the context, exactly once,
/// synchronously. Returns the script's return value — `None` when no
/// `return` executed. Side-channel `print` output goes to `out`.
pub fn invoke(
    program: &Program,
    ctx: &ExecutionContext,
    out: &mut dyn Write,
) -> Result<Option<Value>> {
    let returned = Interp::new(out).run(program, ctx.globals())?;
    debug!(returned = returned.is_some(), "script completed");
    Ok(returned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use serde_json::json;

    fn ctx(input: serde_json::Value) -> ExecutionContext {
        ExecutionContext::new(&input)
    }

    #[test]
    fn test_top_level_return_captured() {
        let program = compile("return input").unwrap();
        let ctx = ctx(json!({"a": 1}));
        let mut out = Vec::new();
        let returned = invoke(&program, &ctx, &mut out).unwrap().unwrap();
        assert_eq!(returned.to_json().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_syntax_error_is_construction_fault() {
        let err = compile("return ][").unwrap_err();
        assert!(matches!(err, HarnessError::Construct(_)));
    }

    #[test]
    fn test_runtime_fault_is_execution_fault() {
        let program = compile("x = 1 / 0").unwrap();
        let ctx = ctx(json!({}));
        let mut out = Vec::new();
        let err = invoke(&program, &ctx, &mut out).unwrap_err();
        assert!(matches!(err, HarnessError::Execute(_)));
    }

    #[test]
    fn test_assignments_visible_after_invocation() {
        let program = compile("result = event").unwrap();
        let ctx = ctx(json!([1, 2]));
        let mut out = Vec::new();
        invoke(&program, &ctx, &mut out).unwrap();
        let result = ctx.lookup("result").unwrap();
        assert_eq!(result.to_json().unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_empty_program_completes_without_value() {
        let program = compile("").unwrap();
        let ctx = ctx(json!({}));
        let mut out = Vec::new();
        assert!(invoke(&program, &ctx, &mut out).unwrap().is_none());
    }
}
