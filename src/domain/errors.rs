use thiserror::Error;

use super::ids::GidError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Work order not found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
    /// An action was dispatched before the committed order context was loaded.
    #[error("Work order must be loaded before dispatching actions")]
    RequiresLoadedWorkOrder,
    #[error(transparent)]
    InvalidId(#[from] GidError),
    #[error("Platform error: {0}")]
    Platform(String),
}
