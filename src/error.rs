use std::fmt;

use serde::{Deserialize, Serialize};

/// How a caller addressed an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationRef {
    Id(u64),
    Index(usize),
}

impl fmt::Display for OperationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationRef::Id(id) => write!(f, "id {}", id),
            OperationRef::Index(idx) => write!(f, "index {}", idx),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Operation not found: {0}")]
    OperationNotFound(OperationRef),

    #[error("Operation history cannot be emptied, and there is no deletion to restore")]
    EmptyHistory,

    #[error("Cycle is closed: no pending operation to resolve")]
    CycleClosed,
}

pub type EngineResult<T> = Result<T, EngineError>;
