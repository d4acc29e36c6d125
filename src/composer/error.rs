use thiserror::Error;

use super::ledger::AssignmentId;

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Failures of the session composition engine.
///
/// A rejected retime at the allocation floor is not an error; see
/// [`AdjustOutcome`](super::AdjustOutcome).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComposeError {
    /// Malformed arguments to `start`. The session was not created.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The component is not part of this session.
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// The assignment was already removed, or never existed.
    #[error("assignment {assignment} not found in component {component}")]
    NotFound {
        component: String,
        assignment: AssignmentId,
    },

    /// The drill catalog could not be reached. Safe to retry later.
    #[error("drill catalog unavailable: {0}")]
    CatalogUnavailable(String),
}
