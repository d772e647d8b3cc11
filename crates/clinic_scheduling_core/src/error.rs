//! crates/clinic_scheduling_core/src/error.rs
//!
//! The engine-level error taxonomy. Every failed invariant produces a
//! typed variant carrying enough context for the HTTP layer to format a
//! user-facing message and pick a status code.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::domain::AppointmentState;
use crate::ports::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Malformed input: bad duration, missing required reason,
    /// non-future date. Recoverable by correcting the request.
    #[error("{0}")]
    Validation(String),

    /// The requested interval is not contained in any working window.
    #[error("interval {start} to {end} falls outside the dentist's working hours")]
    OutsideWorkingHours {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// The requested interval collides with another active appointment.
    #[error("interval overlaps appointment {other_id} ({other_start} to {other_end})")]
    OverlapsExisting {
        other_id: Uuid,
        other_start: NaiveDateTime,
        other_end: NaiveDateTime,
    },

    /// The new availability window collides with an existing one.
    #[error("window overlaps existing availability {other_id}")]
    AvailabilityOverlap { other_id: Uuid },

    /// An action was attempted on an appointment outside the required
    /// state (only `Pending` appointments may change).
    #[error("appointment is {current}, only pending appointments can be modified")]
    InvalidStateTransition { current: AppointmentState },

    #[error("{0} not found")]
    NotFound(String),

    /// Transient storage failure; the operation may be retried.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl ScheduleError {
    /// Maps a store failure, preserving not-found as its own class so the
    /// HTTP layer can answer 404 instead of 500.
    pub(crate) fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ScheduleError::NotFound(what),
            other => ScheduleError::Storage(other),
        }
    }

    /// True for the conflict class of errors (scheduling invariant
    /// violations on well-formed requests).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ScheduleError::OutsideWorkingHours { .. }
                | ScheduleError::OverlapsExisting { .. }
                | ScheduleError::AvailabilityOverlap { .. }
                | ScheduleError::InvalidStateTransition { .. }
        )
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
