//! Error type shared by the library.
//!
//! Everything that crosses a process boundary (files, sockets, devices)
//! reports through [`ControlError`]; arithmetic-layer invariants are
//! asserted instead.

use thiserror::Error;

/// Errors raised by the encrypted control loop
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("dimension mismatch: {0}")]
    Dimension(String),

    #[error("matrix {name} has non-integer entry {value} at ({row}, {col})")]
    NonIntegerMatrix {
        name: &'static str,
        row: usize,
        col: usize,
        value: f64,
    },

    #[error("scale mismatch: s^{left} vs s^{right}")]
    ScaleMismatch { left: u32, right: u32 },

    #[error("malformed frame: {0}")]
    Frame(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("session parameter mismatch: {0}")]
    ParameterMismatch(String),

    #[error("operation {operation} not allowed in phase {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: crate::control::Phase,
    },
}

/// Result type for library operations
pub type Result<T> = std::result::Result<T, ControlError>;
