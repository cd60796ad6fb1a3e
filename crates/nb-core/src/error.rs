use thiserror::Error;

use crate::atomspace::Handle;
use crate::gog::GardenId;

/// Every failure the engine can report. Failed operations leave state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NanoBrainError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid truth value: strength={strength}, confidence={confidence}")]
    InvalidTruthValue { strength: f64, confidence: f64 },

    #[error("unknown atom: {0}")]
    UnknownAtom(Handle),

    #[error("unknown link: {0}")]
    UnknownLink(Handle),

    #[error("unknown garden: {0}")]
    UnknownGarden(GardenId),

    #[error("{0} is the root garden and cannot be removed")]
    ProtectedGarden(GardenId),

    #[error("{0} is not active")]
    NotActive(&'static str),

    #[error("{0} has already been shut down")]
    AlreadyShutdown(&'static str),

    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    #[error("garden depth {depth} exceeds max_depth {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },

    #[error("{id} is referenced by {dependents} link(s)")]
    HasDependents { id: Handle, dependents: usize },

    #[error("type {type_name} is not a {expected} type")]
    TypeKindMismatch {
        type_name: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, NanoBrainError>;
