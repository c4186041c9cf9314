//! Fatal fault taxonomy for one invocation.
//!
//! Serialization failures are deliberately absent: an unrepresentable result
//! is contained inside the emitter (silent success), never surfaced here.

use runlet_script::{ParseError, RuntimeError};

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Faults that abort an invocation with exit status 1.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The combined payload on stdin was not valid JSON.
    #[error("invalid payload: {0}")]
    Payload(serde_json::Error),

    /// The input document was not valid JSON.
    #[error("invalid input JSON: {0}")]
    InputDecode(serde_json::Error),

    /// The script failed to parse; user code never ran.
    #[error(transparent)]
    Construct(#[from] ParseError),

    /// The script faulted while running.
    #[error(transparent)]
    Execute(#[from] RuntimeError),

    /// The output stream could not be written.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
