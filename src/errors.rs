//! Crate-wide error type for the hybrid-automaton engine.

use thiserror::Error;

/// Every failure mode the engine can surface, per the error handling design.
///
/// Each variant carries the offending node's type/name path where one is
/// known, so a caller can pinpoint the faulty part of a description tree
/// without re-walking it.
#[derive(Debug, Error)]
pub enum AutomatonError {
    #[error("parse error at {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("unknown type {type_name:?} at {path}")]
    UnknownType { path: String, type_name: String },

    #[error("duplicate registration of {type_name:?}: already bound to a different target")]
    DuplicateRegistration { type_name: String },

    #[error("duplicate name {name:?} at {path}")]
    DuplicateName { path: String, name: String },

    #[error("missing attribute {attribute:?} at {path}")]
    MissingAttribute { path: String, attribute: String },

    #[error("unresolved reference {reference:?} at {path}")]
    UnresolvedReference { path: String, reference: String },

    #[error("shape mismatch at {path}: {reason}")]
    ShapeMismatch { path: String, reason: String },

    #[error("engine is not armed")]
    NotArmed,

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is halted")]
    Halted,

    #[error("non-monotonic time: tick `t`={t} is before the previous tick `t`={previous}")]
    NonMonotonicTime { previous: f64, t: f64 },

    #[error("system error: {0}")]
    SystemError(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AutomatonError>;
