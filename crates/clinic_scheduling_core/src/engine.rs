//! crates/clinic_scheduling_core/src/engine.rs
//!
//! The scheduling engine is the primary public surface of the subsystem.
//! It enforces the appointment invariants (future start, duration
//! granularity, containment inside working hours, non-overlap, lifecycle
//! transitions) on top of the appointment store and the availability
//! manager, and hands events to the notification dispatcher after each
//! successful commit.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::availability::AvailabilityManager;
use crate::domain::{Appointment, AppointmentNote, AppointmentState, NewAppointment, NewNote};
use crate::error::{ScheduleError, ScheduleResult};
use crate::interval;
use crate::locks::DentistLocks;
use crate::ports::{AppointmentEvent, AppointmentStore, Clock, NotificationDispatcher};

/// Tunables for appointment validation.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Durations must be positive multiples of this step.
    pub granularity_minutes: u32,
    pub min_duration_minutes: u32,
    pub max_duration_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            granularity_minutes: 5,
            min_duration_minutes: 5,
            max_duration_minutes: 480,
        }
    }
}

pub struct SchedulingEngine {
    appointments: Arc<dyn AppointmentStore>,
    availability: Arc<AvailabilityManager>,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    locks: DentistLocks,
    config: EngineConfig,
}

impl SchedulingEngine {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        availability: Arc<AvailabilityManager>,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        locks: DentistLocks,
        config: EngineConfig,
    ) -> Self {
        Self {
            appointments,
            availability,
            clock,
            dispatcher,
            locks,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Books a new appointment. The containment and overlap checks plus
    /// the insert run as one unit under the dentist's lock.
    pub async fn create_appointment(&self, new: NewAppointment) -> ScheduleResult<Appointment> {
        let now = self.clock.now();
        if new.start <= now {
            return Err(ScheduleError::Validation(
                "appointment must start in the future".to_string(),
            ));
        }
        self.validate_duration(new.duration_minutes)?;
        if new.reason.trim().is_empty() {
            return Err(ScheduleError::Validation(
                "appointment reason must not be empty".to_string(),
            ));
        }

        let _guard = self.locks.acquire(new.dentist_id).await;

        let end = new.start + Duration::minutes(i64::from(new.duration_minutes));
        self.check_within_working_hours(new.dentist_id, new.start, end)
            .await?;
        self.check_no_overlap(new.dentist_id, new.start, end, None)
            .await?;

        let created = self
            .appointments
            .insert(new, now)
            .await
            .map_err(ScheduleError::from_store)?;
        info!(
            appointment_id = %created.id,
            dentist_id = %created.dentist_id,
            start = %created.start,
            "appointment booked"
        );
        self.notify(created.id, AppointmentEvent::Booked).await;
        Ok(created)
    }

    /// Cancels a pending appointment, releasing its interval.
    pub async fn cancel_appointment(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> ScheduleResult<Appointment> {
        let updated = self
            .transition(id, AppointmentState::Cancelled, |appointment| {
                appointment.cancellation_reason = reason.clone();
            })
            .await?;
        self.notify(id, AppointmentEvent::Cancelled).await;
        Ok(updated)
    }

    /// Records that the patient showed up. An optional note is appended
    /// to the appointment's annotation trail.
    pub async fn mark_attended(
        &self,
        id: Uuid,
        author_id: Uuid,
        note: Option<String>,
    ) -> ScheduleResult<Appointment> {
        let updated = self.transition(id, AppointmentState::Attended, |_| {}).await?;
        if let Some(body) = note.filter(|n| !n.trim().is_empty()) {
            self.append_note(id, author_id, body).await?;
        }
        self.notify(id, AppointmentEvent::Attended).await;
        Ok(updated)
    }

    /// Records that the patient did not show up. The reason, when given,
    /// is stored on the appointment and appended as a note.
    pub async fn mark_absent(
        &self,
        id: Uuid,
        author_id: Uuid,
        reason: Option<String>,
    ) -> ScheduleResult<Appointment> {
        let reason = reason.filter(|r| !r.trim().is_empty());
        let updated = self
            .transition(id, AppointmentState::Absent, |appointment| {
                appointment.absence_reason = reason.clone();
            })
            .await?;
        if let Some(body) = reason {
            self.append_note(id, author_id, body).await?;
        }
        self.notify(id, AppointmentEvent::MarkedAbsent).await;
        Ok(updated)
    }

    /// Moves a pending appointment to a new start, keeping its duration.
    /// The validation re-runs against the new interval with the
    /// appointment's own id excluded from the overlap scan.
    pub async fn reschedule_appointment(
        &self,
        id: Uuid,
        new_start: NaiveDateTime,
    ) -> ScheduleResult<Appointment> {
        let now = self.clock.now();
        if new_start <= now {
            return Err(ScheduleError::Validation(
                "appointment must be rescheduled to a future time".to_string(),
            ));
        }

        let appointment = self
            .appointments
            .get(id)
            .await
            .map_err(ScheduleError::from_store)?;

        let _guard = self.locks.acquire(appointment.dentist_id).await;

        // Re-read inside the lock; a concurrent transition may have won.
        let mut appointment = self
            .appointments
            .get(id)
            .await
            .map_err(ScheduleError::from_store)?;
        if appointment.state != AppointmentState::Pending {
            return Err(ScheduleError::InvalidStateTransition {
                current: appointment.state,
            });
        }

        let new_end = new_start + Duration::minutes(i64::from(appointment.duration_minutes));
        self.check_within_working_hours(appointment.dentist_id, new_start, new_end)
            .await?;
        self.check_no_overlap(appointment.dentist_id, new_start, new_end, Some(id))
            .await?;

        appointment.start = new_start;
        appointment.updated_at = now;
        let updated = self
            .appointments
            .update(appointment)
            .await
            .map_err(ScheduleError::from_store)?;
        info!(appointment_id = %id, new_start = %new_start, "appointment rescheduled");
        self.notify(id, AppointmentEvent::Rescheduled).await;
        Ok(updated)
    }

    /// All appointments for one dentist/day ordered by start time, for
    /// display. Read-only.
    pub async fn get_day_agenda(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> ScheduleResult<Vec<Appointment>> {
        let mut agenda = self
            .appointments
            .list_for_day(dentist_id, date)
            .await
            .map_err(ScheduleError::from_store)?;
        agenda.sort_by_key(|a| a.start);
        Ok(agenda)
    }

    pub async fn get_appointment(&self, id: Uuid) -> ScheduleResult<Appointment> {
        self.appointments
            .get(id)
            .await
            .map_err(ScheduleError::from_store)
    }

    pub async fn list_patient_appointments(
        &self,
        patient_id: Uuid,
    ) -> ScheduleResult<Vec<Appointment>> {
        let mut appointments = self
            .appointments
            .list_for_patient(patient_id)
            .await
            .map_err(ScheduleError::from_store)?;
        appointments.sort_by_key(|a| a.start);
        Ok(appointments)
    }

    pub async fn list_notes(&self, appointment_id: Uuid) -> ScheduleResult<Vec<AppointmentNote>> {
        self.appointments
            .list_notes(appointment_id)
            .await
            .map_err(ScheduleError::from_store)
    }

    //=====================================================================================
    // Internal helpers
    //=====================================================================================

    /// Runs a terminal state transition under the dentist's lock,
    /// requiring the current state to be `Pending`.
    async fn transition(
        &self,
        id: Uuid,
        target: AppointmentState,
        apply: impl FnOnce(&mut Appointment),
    ) -> ScheduleResult<Appointment> {
        let appointment = self
            .appointments
            .get(id)
            .await
            .map_err(ScheduleError::from_store)?;

        let _guard = self.locks.acquire(appointment.dentist_id).await;

        let mut appointment = self
            .appointments
            .get(id)
            .await
            .map_err(ScheduleError::from_store)?;
        if appointment.state != AppointmentState::Pending {
            return Err(ScheduleError::InvalidStateTransition {
                current: appointment.state,
            });
        }

        appointment.state = target;
        appointment.updated_at = self.clock.now();
        apply(&mut appointment);
        let updated = self
            .appointments
            .update(appointment)
            .await
            .map_err(ScheduleError::from_store)?;
        info!(appointment_id = %id, state = %target, "appointment state changed");
        Ok(updated)
    }

    fn validate_duration(&self, duration_minutes: u32) -> ScheduleResult<()> {
        let cfg = &self.config;
        if duration_minutes == 0 || duration_minutes % cfg.granularity_minutes != 0 {
            return Err(ScheduleError::Validation(format!(
                "duration must be a positive multiple of {} minutes",
                cfg.granularity_minutes
            )));
        }
        if duration_minutes < cfg.min_duration_minutes
            || duration_minutes > cfg.max_duration_minutes
        {
            return Err(ScheduleError::Validation(format!(
                "duration must be between {} and {} minutes",
                cfg.min_duration_minutes, cfg.max_duration_minutes
            )));
        }
        Ok(())
    }

    /// Requires `[start, end)` to be fully contained in at least one
    /// working window of the dentist on the start's day. Intervals that
    /// cross midnight cannot be contained in any window.
    async fn check_within_working_hours(
        &self,
        dentist_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> ScheduleResult<()> {
        let date = start.date();
        let contained = end.date() == date
            && self
                .availability
                .list_working_windows(dentist_id, date)
                .await?
                .iter()
                .any(|&(w_start, w_end)| {
                    interval::contains(
                        date.and_time(w_start),
                        date.and_time(w_end),
                        start,
                        end,
                    )
                });
        if !contained {
            debug!(dentist_id = %dentist_id, start = %start, "interval outside working hours");
            return Err(ScheduleError::OutsideWorkingHours { start, end });
        }
        Ok(())
    }

    /// Requires `[start, end)` to be disjoint from every non-cancelled
    /// appointment of the dentist on that day, excluding `exclude`.
    async fn check_no_overlap(
        &self,
        dentist_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: Option<Uuid>,
    ) -> ScheduleResult<()> {
        let booked = self
            .appointments
            .list_for_day(dentist_id, start.date())
            .await
            .map_err(ScheduleError::from_store)?;
        let collision = booked
            .iter()
            .filter(|a| a.is_active() && Some(a.id) != exclude)
            .find(|a| interval::overlaps(start, end, a.start, a.end()));
        if let Some(other) = collision {
            return Err(ScheduleError::OverlapsExisting {
                other_id: other.id,
                other_start: other.start,
                other_end: other.end(),
            });
        }
        Ok(())
    }

    async fn append_note(&self, appointment_id: Uuid, author_id: Uuid, body: String) -> ScheduleResult<AppointmentNote> {
        self.appointments
            .insert_note(
                NewNote {
                    appointment_id,
                    author_id,
                    body,
                },
                self.clock.now(),
            )
            .await
            .map_err(ScheduleError::from_store)
    }

    /// Fire-and-forget notification after a successful commit. Delivery
    /// failures are logged and never surface as engine errors.
    async fn notify(&self, appointment_id: Uuid, event: AppointmentEvent) {
        if let Err(err) = self.dispatcher.dispatch(appointment_id, event).await {
            warn!(appointment_id = %appointment_id, ?event, %err, "notification dispatch failed");
        }
    }
}
