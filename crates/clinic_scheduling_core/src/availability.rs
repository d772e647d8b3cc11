//! crates/clinic_scheduling_core/src/availability.rs
//!
//! The availability manager enforces the window invariants on top of the
//! availability store: minimum block size, non-overlap per dentist/day,
//! and a required reason for non-working blocks.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Availability, AvailabilityKind, NewAvailability};
use crate::error::{ScheduleError, ScheduleResult};
use crate::interval;
use crate::locks::DentistLocks;
use crate::ports::{AppointmentStore, AvailabilityStore, Clock};

/// Tunables for window validation.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityConfig {
    /// Minimum window length in minutes.
    pub min_window_minutes: u32,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            min_window_minutes: 60,
        }
    }
}

pub struct AvailabilityManager {
    windows: Arc<dyn AvailabilityStore>,
    appointments: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    locks: DentistLocks,
    config: AvailabilityConfig,
}

impl AvailabilityManager {
    pub fn new(
        windows: Arc<dyn AvailabilityStore>,
        appointments: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
        locks: DentistLocks,
        config: AvailabilityConfig,
    ) -> Self {
        Self {
            windows,
            appointments,
            clock,
            locks,
            config,
        }
    }

    /// Validates and persists a new window. The read-validate-write
    /// sequence runs under the dentist's lock so two concurrent requests
    /// cannot both claim overlapping time.
    pub async fn create_availability(&self, new: NewAvailability) -> ScheduleResult<Availability> {
        self.validate_shape(&new)?;

        let _guard = self.locks.acquire(new.dentist_id).await;

        if let Some(other_id) = self
            .find_overlap(new.dentist_id, new.date, new.start_time, new.end_time, None)
            .await?
        {
            return Err(ScheduleError::AvailabilityOverlap { other_id });
        }

        let created = self
            .windows
            .insert(new)
            .await
            .map_err(ScheduleError::from_store)?;
        info!(
            window_id = %created.id,
            dentist_id = %created.dentist_id,
            date = %created.date,
            kind = %created.kind,
            "availability window created"
        );
        Ok(created)
    }

    /// Soft-deletes a window. Deletion is refused while any pending
    /// appointment falls inside the window, and it serializes against
    /// in-flight bookings for the same dentist so a window cannot vanish
    /// mid-booking.
    pub async fn delete_availability(&self, id: Uuid) -> ScheduleResult<()> {
        let window = self
            .windows
            .get(id, false)
            .await
            .map_err(ScheduleError::from_store)?;

        let _guard = self.locks.acquire(window.dentist_id).await;

        // Re-read inside the lock: a concurrent delete may have won.
        let window = self
            .windows
            .get(id, false)
            .await
            .map_err(ScheduleError::from_store)?;

        if window.is_working() {
            let booked = self
                .appointments
                .list_for_day(window.dentist_id, window.date)
                .await
                .map_err(ScheduleError::from_store)?;
            let blocking = booked.iter().find(|a| {
                a.state == crate::domain::AppointmentState::Pending
                    && interval::overlaps(window.start(), window.end(), a.start, a.end())
            });
            if let Some(appointment) = blocking {
                return Err(ScheduleError::Validation(format!(
                    "window still holds pending appointment {}; cancel or reschedule it first",
                    appointment.id
                )));
            }
        }

        self.windows
            .soft_delete(id, self.clock.now())
            .await
            .map_err(ScheduleError::from_store)?;
        info!(window_id = %id, dentist_id = %window.dentist_id, "availability window deleted");
        Ok(())
    }

    /// The working windows for one dentist/day as `(start, end)` pairs,
    /// ordered by start time.
    pub async fn list_working_windows(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> ScheduleResult<Vec<(NaiveTime, NaiveTime)>> {
        let mut windows: Vec<(NaiveTime, NaiveTime)> = self
            .windows
            .list_for_day(dentist_id, date, false)
            .await
            .map_err(ScheduleError::from_store)?
            .into_iter()
            .filter(Availability::is_working)
            .map(|w| (w.start_time, w.end_time))
            .collect();
        windows.sort_by_key(|&(start, _)| start);
        Ok(windows)
    }

    /// All windows for one dentist/day, for display and admin paths.
    pub async fn list_for_day(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        include_deleted: bool,
    ) -> ScheduleResult<Vec<Availability>> {
        let mut windows = self
            .windows
            .list_for_day(dentist_id, date, include_deleted)
            .await
            .map_err(ScheduleError::from_store)?;
        windows.sort_by_key(|w| w.start_time);
        Ok(windows)
    }

    /// Reusable overlap probe: does `[start, end)` collide with any
    /// non-deleted window for the dentist/day (other than `exclude`)?
    pub async fn windows_overlap(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude: Option<Uuid>,
    ) -> ScheduleResult<bool> {
        Ok(self
            .find_overlap(dentist_id, date, start, end, exclude)
            .await?
            .is_some())
    }

    async fn find_overlap(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude: Option<Uuid>,
    ) -> ScheduleResult<Option<Uuid>> {
        let existing = self
            .windows
            .list_for_day(dentist_id, date, false)
            .await
            .map_err(ScheduleError::from_store)?;
        let hit = existing
            .iter()
            .filter(|w| Some(w.id) != exclude)
            .find(|w| interval::overlaps(start, end, w.start_time, w.end_time));
        if let Some(w) = hit {
            debug!(dentist_id = %dentist_id, other = %w.id, "window overlap detected");
        }
        Ok(hit.map(|w| w.id))
    }

    fn validate_shape(&self, new: &NewAvailability) -> ScheduleResult<()> {
        if new.start_time >= new.end_time {
            return Err(ScheduleError::Validation(
                "window start must precede its end".to_string(),
            ));
        }
        let length = (new.end_time - new.start_time).num_minutes();
        if length < i64::from(self.config.min_window_minutes) {
            return Err(ScheduleError::Validation(format!(
                "window must be at least {} minutes long",
                self.config.min_window_minutes
            )));
        }
        match new.kind {
            AvailabilityKind::NonWorking => {
                let has_reason = new
                    .reason
                    .as_deref()
                    .map(|r| !r.trim().is_empty())
                    .unwrap_or(false);
                if !has_reason {
                    return Err(ScheduleError::Validation(
                        "a non-working window requires a reason".to_string(),
                    ));
                }
            }
            AvailabilityKind::Working => {
                if new.reason.is_some() {
                    return Err(ScheduleError::Validation(
                        "a working window does not take a reason".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
