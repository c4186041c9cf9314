//! Execution-and-result-capture protocol for one-shot script invocations.
//!
//! The pipeline is one linear, synchronous sequence per process:
//! decode input → build context → execute → resolve → emit. Exactly one of
//! {stdout JSON line, fatal fault} is produced per invocation, except the
//! documented silent-success cases (no result candidate, or an
//! unrepresentable result).
//!
//! ```
//! let mut out = Vec::new();
//! runlet_harness::run_invocation(
//!     r#"return {"message": "Hello " + input["name"]}"#,
//!     r#"{"name": "Ada"}"#,
//!     &mut out,
//! )
//! .unwrap();
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "{\"message\":\"Hello Ada\"}\n"
//! );
//! ```

pub mod adapter;
pub mod context;
pub mod error;
pub mod payload;
pub mod resolve;

use std::io::Write;

use tracing::debug;

pub use adapter::{compile, invoke};
pub use context::{decode_input, ExecutionContext};
pub use error::{HarnessError, Result};
pub use payload::Payload;
pub use resolve::{emit, resolve};

/// Run one invocation: execute `code` against `raw_input` (JSON text, blank
/// meaning `{}`), writing at most one JSON result line to `out`.
///
/// Faults propagate as [`HarnessError`]; the caller maps them to the
/// `Error: <message>` diagnostic and a non-zero exit status. On `Ok(())`
/// the invocation succeeded, with or without a printed result.
pub fn run_invocation(code: &str, raw_input: &str, out: &mut dyn Write) -> Result<()> {
    let input = decode_input(raw_input)?;
    let ctx = ExecutionContext::new(&input);

    let program = compile(code)?;
    debug!(statements = program.stmts.len(), "script compiled");
    let returned = invoke(&program, &ctx, out)?;

    match resolve(&ctx, returned) {
        Some(value) => emit(&value, out),
        None => Ok(()),
    }
}

/// Run one invocation from a combined payload document.
pub fn run_payload(raw_payload: &str, out: &mut dyn Write) -> Result<()> {
    let payload = Payload::parse(raw_payload)?;
    run_invocation(&payload.code, &payload.input, out)
}
