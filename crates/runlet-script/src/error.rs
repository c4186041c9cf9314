//! Error types for script compilation and execution.

use thiserror::Error;

/// A script failed to lex or parse.
#[derive(Debug, Clone, Error)]
#[error("syntax error at line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// A script faulted while running.
#[derive(Debug, Clone, Error)]
#[error("runtime error at line {line}: {message}")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}
