//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `AvailabilityStore` and `AppointmentStore` ports
//! from the core crate. It handles all interactions with the PostgreSQL
//! database using `sqlx`.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use clinic_scheduling_core::domain::{
    Appointment, AppointmentNote, AppointmentState, Availability, AvailabilityKind,
    NewAppointment, NewAvailability, NewNote,
};
use clinic_scheduling_core::ports::{
    AppointmentStore, AvailabilityStore, StoreError, StoreResult,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements both store ports against one pool.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Serialization failures and deadlocks abort the transaction but are
/// retryable; everything else is unexpected.
fn unexpected(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db)
            if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) =>
        {
            StoreError::Conflict(e.to_string())
        }
        _ => StoreError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AvailabilityRecord {
    id: Uuid,
    dentist_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    kind: String,
    reason: Option<String>,
    created_by: Uuid,
    deleted_at: Option<NaiveDateTime>,
}

impl AvailabilityRecord {
    fn to_domain(self) -> StoreResult<Availability> {
        let kind = self
            .kind
            .parse::<AvailabilityKind>()
            .map_err(StoreError::Unexpected)?;
        Ok(Availability {
            id: self.id,
            dentist_id: self.dentist_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            kind,
            reason: self.reason,
            created_by: self.created_by,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(FromRow)]
struct AppointmentRecord {
    id: Uuid,
    dentist_id: Uuid,
    patient_id: Uuid,
    start_at: NaiveDateTime,
    duration_minutes: i32,
    reason: String,
    state: String,
    cancellation_reason: Option<String>,
    absence_reason: Option<String>,
    booked_by: Uuid,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl AppointmentRecord {
    fn to_domain(self) -> StoreResult<Appointment> {
        let state = self
            .state
            .parse::<AppointmentState>()
            .map_err(StoreError::Unexpected)?;
        Ok(Appointment {
            id: self.id,
            dentist_id: self.dentist_id,
            patient_id: self.patient_id,
            start: self.start_at,
            duration_minutes: self.duration_minutes as u32,
            reason: self.reason,
            state,
            cancellation_reason: self.cancellation_reason,
            absence_reason: self.absence_reason,
            booked_by: self.booked_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    appointment_id: Uuid,
    author_id: Uuid,
    body: String,
    created_at: NaiveDateTime,
}

impl NoteRecord {
    fn to_domain(self) -> AppointmentNote {
        AppointmentNote {
            id: self.id,
            appointment_id: self.appointment_id,
            author_id: self.author_id,
            body: self.body,
            created_at: self.created_at,
        }
    }
}

const AVAILABILITY_COLUMNS: &str =
    "id, dentist_id, date, start_time, end_time, kind, reason, created_by, deleted_at";
const APPOINTMENT_COLUMNS: &str = "id, dentist_id, patient_id, start_at, duration_minutes, \
     reason, state, cancellation_reason, absence_reason, booked_by, created_at, updated_at";

//=========================================================================================
// `AvailabilityStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AvailabilityStore for DbAdapter {
    async fn insert(&self, new: NewAvailability) -> StoreResult<Availability> {
        let sql = format!(
            "INSERT INTO availability (id, dentist_id, date, start_time, end_time, kind, reason, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {AVAILABILITY_COLUMNS}"
        );
        let record = sqlx::query_as::<_, AvailabilityRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.dentist_id)
            .bind(new.date)
            .bind(new.start_time)
            .bind(new.end_time)
            .bind(new.kind.to_string())
            .bind(new.reason)
            .bind(new.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get(&self, id: Uuid, include_deleted: bool) -> StoreResult<Availability> {
        let sql = if include_deleted {
            format!("SELECT {AVAILABILITY_COLUMNS} FROM availability WHERE id = $1")
        } else {
            format!(
                "SELECT {AVAILABILITY_COLUMNS} FROM availability WHERE id = $1 AND deleted_at IS NULL"
            )
        };
        let record = sqlx::query_as::<_, AvailabilityRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| StoreError::NotFound(format!("availability window {}", id)))?;
        record.to_domain()
    }

    async fn list_for_day(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        include_deleted: bool,
    ) -> StoreResult<Vec<Availability>> {
        let sql = if include_deleted {
            format!(
                "SELECT {AVAILABILITY_COLUMNS} FROM availability \
                 WHERE dentist_id = $1 AND date = $2 ORDER BY start_time ASC"
            )
        } else {
            format!(
                "SELECT {AVAILABILITY_COLUMNS} FROM availability \
                 WHERE dentist_id = $1 AND date = $2 AND deleted_at IS NULL ORDER BY start_time ASC"
            )
        };
        let records = sqlx::query_as::<_, AvailabilityRecord>(&sql)
            .bind(dentist_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(AvailabilityRecord::to_domain).collect()
    }

    async fn soft_delete(&self, id: Uuid, deleted_at: NaiveDateTime) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE availability SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .bind(deleted_at)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("availability window {}", id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `AppointmentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AppointmentStore for DbAdapter {
    async fn insert(
        &self,
        new: NewAppointment,
        created_at: NaiveDateTime,
    ) -> StoreResult<Appointment> {
        let sql = format!(
            "INSERT INTO appointments (id, dentist_id, patient_id, start_at, duration_minutes, \
             reason, state, booked_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $8) RETURNING {APPOINTMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.dentist_id)
            .bind(new.patient_id)
            .bind(new.start)
            .bind(new.duration_minutes as i32)
            .bind(new.reason)
            .bind(new.booked_by)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get(&self, id: Uuid) -> StoreResult<Appointment> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        let record = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", id)))?;
        record.to_domain()
    }

    async fn list_for_day(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = day_start + chrono::Duration::days(1);
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE dentist_id = $1 AND start_at >= $2 AND start_at < $3 ORDER BY start_at ASC"
        );
        let records = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(dentist_id)
            .bind(day_start)
            .bind(day_end)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(AppointmentRecord::to_domain).collect()
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE patient_id = $1 ORDER BY start_at ASC"
        );
        let records = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(AppointmentRecord::to_domain).collect()
    }

    async fn update(&self, appointment: Appointment) -> StoreResult<Appointment> {
        let sql = format!(
            "UPDATE appointments SET start_at = $2, state = $3, cancellation_reason = $4, \
             absence_reason = $5, updated_at = $6 WHERE id = $1 RETURNING {APPOINTMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(appointment.id)
            .bind(appointment.start)
            .bind(appointment.state.to_string())
            .bind(appointment.cancellation_reason)
            .bind(appointment.absence_reason)
            .bind(appointment.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment.id)))?;
        record.to_domain()
    }

    async fn insert_note(
        &self,
        new: NewNote,
        created_at: NaiveDateTime,
    ) -> StoreResult<AppointmentNote> {
        let record = sqlx::query_as::<_, NoteRecord>(
            "INSERT INTO appointment_notes (id, appointment_id, author_id, body, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id, appointment_id, author_id, body, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(new.appointment_id)
        .bind(new.author_id)
        .bind(new.body)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_notes(&self, appointment_id: Uuid) -> StoreResult<Vec<AppointmentNote>> {
        let records = sqlx::query_as::<_, NoteRecord>(
            "SELECT id, appointment_id, author_id, body, created_at FROM appointment_notes \
             WHERE appointment_id = $1 ORDER BY created_at ASC",
        )
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(NoteRecord::to_domain).collect())
    }
}
