//! crates/clinic_scheduling_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the scheduling engine.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! engine to be independent of specific external implementations like
//! databases or notification channels.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::domain::{
    Appointment, AppointmentNote, Availability, NewAppointment, NewAvailability, NewNote,
};

//=========================================================================================
// Generic Store Error and Result Types
//=========================================================================================

/// A generic error type for all store operations.
/// This abstracts away the specific errors from external services
/// (e.g., database driver errors).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A transactional abort (e.g., concurrent-modification failure).
    /// Retryable by the caller.
    #[error("Storage conflict: {0}")]
    Conflict(String),
    #[error("An unexpected storage error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Persists a new window, assigning its id, and returns the stored row.
    async fn insert(&self, new: NewAvailability) -> StoreResult<Availability>;

    /// Fetches a window by id. Soft-deleted rows are reported as
    /// `NotFound` unless `include_deleted` is set.
    async fn get(&self, id: Uuid, include_deleted: bool) -> StoreResult<Availability>;

    /// All windows for one dentist on one day, ordered by start time.
    /// Soft-deleted rows are filtered out unless `include_deleted` is set.
    async fn list_for_day(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        include_deleted: bool,
    ) -> StoreResult<Vec<Availability>>;

    /// Tombstones a window. Reports `NotFound` for unknown or
    /// already-deleted ids.
    async fn soft_delete(&self, id: Uuid, deleted_at: NaiveDateTime) -> StoreResult<()>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Persists a new appointment in state `Pending`, assigning its id,
    /// and returns the stored row. Both timestamps are set to `created_at`.
    async fn insert(
        &self,
        new: NewAppointment,
        created_at: NaiveDateTime,
    ) -> StoreResult<Appointment>;

    async fn get(&self, id: Uuid) -> StoreResult<Appointment>;

    /// All appointments (any state) for one dentist starting on one day.
    async fn list_for_day(&self, dentist_id: Uuid, date: NaiveDate)
        -> StoreResult<Vec<Appointment>>;

    /// All appointments for one patient, ordered by start time.
    async fn list_for_patient(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>>;

    /// Writes back a mutated row (state, start, reasons, updated_at).
    async fn update(&self, appointment: Appointment) -> StoreResult<Appointment>;

    /// Appends a note; notes are never updated or removed.
    async fn insert_note(
        &self,
        new: NewNote,
        created_at: NaiveDateTime,
    ) -> StoreResult<AppointmentNote>;

    async fn list_notes(&self, appointment_id: Uuid) -> StoreResult<Vec<AppointmentNote>>;
}

//=========================================================================================
// Clock and Notification Ports
//=========================================================================================

/// Source of the current clinic-local time. Injected so the
/// strictly-in-the-future rules are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The scheduling events handed to the notification dispatcher after a
/// successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentEvent {
    Booked,
    Cancelled,
    Attended,
    MarkedAbsent,
    Rescheduled,
}

#[derive(Debug, thiserror::Error)]
#[error("notification dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Narrow interface to the notification subsystem. Concrete channels
/// (email, SMS, app push) are adapters behind this trait; a dispatch
/// failure is logged by the engine and never rolls back scheduling work.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        appointment_id: Uuid,
        event: AppointmentEvent,
    ) -> Result<(), DispatchError>;
}
