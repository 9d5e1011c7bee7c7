use ulid::Ulid;

use crate::model::BookingStatus;

#[derive(Debug)]
pub enum EngineError {
    Validation(&'static str),
    Authorization(&'static str),
    NotFound(Ulid),
    /// Carries the booking that already holds the slot.
    Conflict(Ulid),
    InvalidState {
        status: BookingStatus,
        action: &'static str,
    },
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "invalid input: {msg}"),
            EngineError::Authorization(action) => write!(f, "not allowed to {action}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::Conflict(id) => {
                write!(f, "slot already confirmed for booking: {id}")
            }
            EngineError::InvalidState { status, action } => {
                write!(f, "cannot {action}: booking is {status}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
