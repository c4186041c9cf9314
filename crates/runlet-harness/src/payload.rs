//! Combined-payload envelope: `{ "code": "...", "input": "<json text>" }`.
//!
//! The `input` field is a *string containing JSON*, not inline JSON — the
//! transport hands the input document through opaquely and the Context
//! Builder decodes it in a separate step with its own fault class.

use serde::Deserialize;

use crate::error::{HarnessError, Result};

/// One invocation request as delivered on stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct Payload {
    /// Arbitrary script source text.
    #[serde(default)]
    pub code: String,
    /// JSON text of the input value; blank means "no input".
    #[serde(default)]
    pub input: String,
}

impl Payload {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(HarnessError::Payload)
    }
}
