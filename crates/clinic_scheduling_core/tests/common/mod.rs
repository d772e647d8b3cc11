//! Shared in-memory fakes and fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use clinic_scheduling_core::domain::{
    Appointment, AppointmentNote, AppointmentState, Availability, NewAppointment,
    NewAvailability, NewNote,
};
use clinic_scheduling_core::ports::{
    AppointmentEvent, AppointmentStore, AvailabilityStore, Clock, DispatchError,
    NotificationDispatcher, StoreError, StoreResult,
};
use clinic_scheduling_core::{
    AvailabilityConfig, AvailabilityManager, DentistLocks, EngineConfig, SchedulingEngine,
    SlotGenerator,
};

//=========================================================================================
// In-memory store fakes
//=========================================================================================

#[derive(Default)]
pub struct MemoryAvailabilityStore {
    rows: Mutex<Vec<Availability>>,
}

#[async_trait]
impl AvailabilityStore for MemoryAvailabilityStore {
    async fn insert(&self, new: NewAvailability) -> StoreResult<Availability> {
        let row = Availability {
            id: Uuid::new_v4(),
            dentist_id: new.dentist_id,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            kind: new.kind,
            reason: new.reason,
            created_by: new.created_by,
            deleted_at: None,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid, include_deleted: bool) -> StoreResult<Availability> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == id && (include_deleted || !w.is_deleted()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("availability {}", id)))
    }

    async fn list_for_day(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        include_deleted: bool,
    ) -> StoreResult<Vec<Availability>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|w| {
                w.dentist_id == dentist_id
                    && w.date == date
                    && (include_deleted || !w.is_deleted())
            })
            .cloned()
            .collect())
    }

    async fn soft_delete(&self, id: Uuid, deleted_at: NaiveDateTime) -> StoreResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|w| w.id == id && !w.is_deleted())
            .ok_or_else(|| StoreError::NotFound(format!("availability {}", id)))?;
        row.deleted_at = Some(deleted_at);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAppointmentStore {
    rows: Mutex<Vec<Appointment>>,
    notes: Mutex<Vec<AppointmentNote>>,
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn insert(
        &self,
        new: NewAppointment,
        created_at: NaiveDateTime,
    ) -> StoreResult<Appointment> {
        let row = Appointment {
            id: Uuid::new_v4(),
            dentist_id: new.dentist_id,
            patient_id: new.patient_id,
            start: new.start,
            duration_minutes: new.duration_minutes,
            reason: new.reason,
            state: AppointmentState::Pending,
            cancellation_reason: None,
            absence_reason: None,
            booked_by: new.booked_by,
            created_at,
            updated_at: created_at,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Appointment> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", id)))
    }

    async fn list_for_day(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.dentist_id == dentist_id && a.date() == date)
            .cloned()
            .collect())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn update(&self, appointment: Appointment) -> StoreResult<Appointment> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment.id)))?;
        *row = appointment.clone();
        Ok(appointment)
    }

    async fn insert_note(
        &self,
        new: NewNote,
        created_at: NaiveDateTime,
    ) -> StoreResult<AppointmentNote> {
        let note = AppointmentNote {
            id: Uuid::new_v4(),
            appointment_id: new.appointment_id,
            author_id: new.author_id,
            body: new.body,
            created_at,
        };
        self.notes.lock().unwrap().push(note.clone());
        Ok(note)
    }

    async fn list_notes(&self, appointment_id: Uuid) -> StoreResult<Vec<AppointmentNote>> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.appointment_id == appointment_id)
            .cloned()
            .collect())
    }
}

//=========================================================================================
// Clock and dispatcher fakes
//=========================================================================================

pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<(Uuid, AppointmentEvent)>>,
    fail: AtomicBool,
}

impl RecordingDispatcher {
    pub fn events(&self) -> Vec<(Uuid, AppointmentEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn fail_next_dispatches(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        appointment_id: Uuid,
        event: AppointmentEvent,
    ) -> Result<(), DispatchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError("channel unreachable".to_string()));
        }
        self.events.lock().unwrap().push((appointment_id, event));
        Ok(())
    }
}

//=========================================================================================
// Fixture wiring
//=========================================================================================

pub struct Fixture {
    pub engine: Arc<SchedulingEngine>,
    pub availability: Arc<AvailabilityManager>,
    pub slots: SlotGenerator,
    pub clock: Arc<FixedClock>,
    pub dispatcher: Arc<RecordingDispatcher>,
}

/// Wires the whole engine against in-memory stores, a fixed clock
/// (2025-06-01 08:00) and a recording dispatcher.
pub fn fixture() -> Fixture {
    let availability_store = Arc::new(MemoryAvailabilityStore::default());
    let appointment_store = Arc::new(MemoryAppointmentStore::default());
    let clock = Arc::new(FixedClock::at(dt(2025, 6, 1, 8, 0)));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let locks = DentistLocks::new();

    let availability = Arc::new(AvailabilityManager::new(
        availability_store,
        appointment_store.clone(),
        clock.clone(),
        locks.clone(),
        AvailabilityConfig::default(),
    ));
    let engine = Arc::new(SchedulingEngine::new(
        appointment_store.clone(),
        availability.clone(),
        clock.clone(),
        dispatcher.clone(),
        locks,
        EngineConfig::default(),
    ));
    let slots = SlotGenerator::new(
        availability.clone(),
        appointment_store,
        EngineConfig::default(),
    );

    Fixture {
        engine,
        availability,
        slots,
        clock,
        dispatcher,
    }
}

pub fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn dt(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    d(year, month, day).and_time(t(hour, minute))
}

/// Declares a working window for the dentist through the manager.
pub async fn working_window(
    fx: &Fixture,
    dentist_id: Uuid,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Availability {
    fx.availability
        .create_availability(NewAvailability {
            dentist_id,
            date,
            start_time: start,
            end_time: end,
            kind: clinic_scheduling_core::AvailabilityKind::Working,
            reason: None,
            created_by: Uuid::new_v4(),
        })
        .await
        .expect("working window should be accepted")
}

/// A well-formed booking request inside the standard fixture window.
pub fn booking(
    dentist_id: Uuid,
    patient_id: Uuid,
    start: NaiveDateTime,
    duration_minutes: u32,
) -> NewAppointment {
    NewAppointment {
        dentist_id,
        patient_id,
        start,
        duration_minutes,
        reason: "routine check-up".to_string(),
        booked_by: Uuid::new_v4(),
    }
}
