use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{Action, ReservationStatus};

#[derive(Debug)]
pub enum EngineError {
    /// Room or reservation is absent or logically deleted.
    NotFound(Ulid),
    /// Malformed input caught before it reaches the state machine.
    Validation(String),
    InvalidInterval {
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Caller is neither the reservation's customer nor the room's owner,
    /// or is the customer attempting an owner-only action.
    Unauthorized(Ulid),
    /// Another occupying reservation already holds (part of) the stay.
    Conflict(Ulid),
    InvalidTransition {
        id: Ulid,
        from: ReservationStatus,
        action: Action,
    },
    /// Customers may only cancel while the request is still pending.
    CancelNotAllowed {
        id: Ulid,
        status: ReservationStatus,
    },
    NotYetStarted {
        id: Ulid,
        start_date: NaiveDate,
    },
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::Validation(msg) => write!(f, "invalid request: {msg}"),
            EngineError::InvalidInterval { start, end } => {
                write!(f, "invalid interval [{start}, {end}): minimum stay is 1 night")
            }
            EngineError::Unauthorized(user) => {
                write!(f, "user {user} is not allowed to perform this action")
            }
            EngineError::Conflict(id) => write!(f, "conflict with reservation: {id}"),
            EngineError::InvalidTransition { id, from, action } => {
                write!(f, "cannot {action} reservation {id} in status {from}")
            }
            EngineError::CancelNotAllowed { id, status } => write!(
                f,
                "reservation {id} is {status}; only the resort owner can cancel it now"
            ),
            EngineError::NotYetStarted { id, start_date } => {
                write!(f, "reservation {id} starts on {start_date} and cannot be completed yet")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
