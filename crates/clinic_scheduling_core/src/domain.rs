//! crates/clinic_scheduling_core/src/domain.rs
//!
//! Defines the pure, core data structures for the scheduling engine.
//! These structs are independent of any database or serialization format.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Whether an availability window opens the dentist for booking or
/// explicitly blocks the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityKind {
    Working,
    NonWorking,
}

impl fmt::Display for AvailabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityKind::Working => write!(f, "working"),
            AvailabilityKind::NonWorking => write!(f, "non_working"),
        }
    }
}

impl FromStr for AvailabilityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(AvailabilityKind::Working),
            "non_working" => Ok(AvailabilityKind::NonWorking),
            other => Err(format!("unknown availability kind '{}'", other)),
        }
    }
}

/// A declared time window for one dentist on one calendar day.
///
/// Windows are half-open `[start_time, end_time)`. Removed windows are
/// tombstoned through `deleted_at` rather than hard-deleted.
#[derive(Debug, Clone)]
pub struct Availability {
    pub id: Uuid,
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub kind: AvailabilityKind,
    pub reason: Option<String>,
    pub created_by: Uuid,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Availability {
    pub fn is_working(&self) -> bool {
        self.kind == AvailabilityKind::Working
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Window start as an absolute date-time on the window's day.
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Window end as an absolute date-time on the window's day.
    pub fn end(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }
}

/// Input model for creating an availability window. The id is assigned
/// by the store on insert.
#[derive(Debug, Clone)]
pub struct NewAvailability {
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub kind: AvailabilityKind,
    pub reason: Option<String>,
    pub created_by: Uuid,
}

/// Lifecycle state of an appointment. `Pending` is the only non-terminal
/// state; the three others are terminal and freeze the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentState {
    Pending,
    Attended,
    Absent,
    Cancelled,
}

impl AppointmentState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentState::Pending)
    }
}

impl fmt::Display for AppointmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentState::Pending => write!(f, "pending"),
            AppointmentState::Attended => write!(f, "attended"),
            AppointmentState::Absent => write!(f, "absent"),
            AppointmentState::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for AppointmentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentState::Pending),
            "attended" => Ok(AppointmentState::Attended),
            "absent" => Ok(AppointmentState::Absent),
            "cancelled" => Ok(AppointmentState::Cancelled),
            other => Err(format!("unknown appointment state '{}'", other)),
        }
    }
}

/// A booked encounter between one patient and one dentist.
///
/// The occupied interval is half-open `[start, end())`.
#[derive(Debug, Clone)]
pub struct Appointment {
    pub id: Uuid,
    pub dentist_id: Uuid,
    pub patient_id: Uuid,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub reason: String,
    pub state: AppointmentState,
    pub cancellation_reason: Option<String>,
    pub absence_reason: Option<String>,
    pub booked_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// The calendar day the appointment starts on.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn is_active(&self) -> bool {
        self.state != AppointmentState::Cancelled
    }
}

/// Input model for booking an appointment. New appointments always enter
/// the store in state `Pending`; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub dentist_id: Uuid,
    pub patient_id: Uuid,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub reason: String,
    pub booked_by: Uuid,
}

/// A free-text annotation recorded against an appointment when its
/// outcome is registered. Append-only.
#[derive(Debug, Clone)]
pub struct AppointmentNote {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: NaiveDateTime,
}

/// Input model for a note; id assigned by the store.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub appointment_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}
