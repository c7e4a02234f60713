use thiserror::Error;

use crate::dialogue::{ErrorKind, IllegalTransition};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    /// The operation is not valid in the current state
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// The operation drove the session into the error state
    #[error("session failed: {0}")]
    Session(ErrorKind),

    /// A reset superseded the operation; its results were discarded
    #[error("operation cancelled by reset")]
    Cancelled,
}
