//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification. Each handler is a thin
//! translation layer: parse the request, call the engine, map the typed
//! engine error to a status code.

use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clinic_scheduling_core::domain::{
    Appointment, AppointmentNote, Availability, AvailabilityKind, NewAppointment,
    NewAvailability,
};
use clinic_scheduling_core::ScheduleError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_appointments_handler,
        create_appointment_handler,
        cancel_appointment_handler,
        attend_appointment_handler,
        absent_appointment_handler,
        reschedule_appointment_handler,
        list_notes_handler,
        free_slots_handler,
        create_availability_handler,
        list_availability_handler,
        delete_availability_handler,
    ),
    components(schemas(
        AppointmentResponse,
        NoteResponse,
        AvailabilityResponse,
        FreeSlotsResponse,
        CreateAppointmentRequest,
        CancelAppointmentRequest,
        AttendAppointmentRequest,
        AbsentAppointmentRequest,
        RescheduleAppointmentRequest,
        CreateAvailabilityRequest,
        AvailabilityKindDto,
    )),
    tags(
        (name = "Scheduling API", description = "Appointment scheduling endpoints for the clinic backend.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub dentist_id: Uuid,
    pub patient_id: Uuid,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: u32,
    pub reason: String,
    pub state: String,
    pub cancellation_reason: Option<String>,
    pub absence_reason: Option<String>,
    pub booked_by: Uuid,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            dentist_id: appointment.dentist_id,
            patient_id: appointment.patient_id,
            start: appointment.start,
            end: appointment.end(),
            duration_minutes: appointment.duration_minutes,
            reason: appointment.reason,
            state: appointment.state.to_string(),
            cancellation_reason: appointment.cancellation_reason,
            absence_reason: appointment.absence_reason,
            booked_by: appointment.booked_by,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct NoteResponse {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: NaiveDateTime,
}

impl From<AppointmentNote> for NoteResponse {
    fn from(note: AppointmentNote) -> Self {
        Self {
            id: note.id,
            appointment_id: note.appointment_id,
            author_id: note.author_id,
            body: note.body,
            created_at: note.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub id: Uuid,
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub kind: String,
    pub reason: Option<String>,
    pub deleted_at: Option<NaiveDateTime>,
}

impl From<Availability> for AvailabilityResponse {
    fn from(window: Availability) -> Self {
        Self {
            id: window.id,
            dentist_id: window.dentist_id,
            date: window.date,
            start_time: window.start_time,
            end_time: window.end_time,
            kind: window.kind.to_string(),
            reason: window.reason,
            deleted_at: window.deleted_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FreeSlotsResponse {
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub step_minutes: u32,
    pub slots: Vec<NaiveTime>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateAppointmentRequest {
    pub dentist_id: Uuid,
    pub patient_id: Uuid,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AttendAppointmentRequest {
    pub note: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AbsentAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RescheduleAppointmentRequest {
    pub new_start: NaiveDateTime,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityKindDto {
    Working,
    NonWorking,
}

impl From<AvailabilityKindDto> for AvailabilityKind {
    fn from(kind: AvailabilityKindDto) -> Self {
        match kind {
            AvailabilityKindDto::Working => AvailabilityKind::Working,
            AvailabilityKindDto::NonWorking => AvailabilityKind::NonWorking,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateAvailabilityRequest {
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub kind: AvailabilityKindDto,
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct AgendaQuery {
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    /// When given, the agenda is narrowed to one patient.
    pub patient_id: Option<Uuid>,
}

#[derive(Deserialize, IntoParams)]
pub struct FreeSlotsQuery {
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: u32,
    /// Candidate step; defaults to the configured step when omitted.
    pub step_minutes: Option<u32>,
}

#[derive(Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    pub dentist_id: Uuid,
    pub date: NaiveDate,
    /// Includes tombstoned windows; admin paths only.
    pub include_deleted: Option<bool>,
}

//=========================================================================================
// Error Translation Helpers
//=========================================================================================

/// Maps an engine error to the HTTP status the REST contract promises:
/// validation 400, missing 404, scheduling conflicts 409, storage 500.
fn schedule_error_response(err: ScheduleError) -> (StatusCode, String) {
    let status = match &err {
        ScheduleError::Validation(_) => StatusCode::BAD_REQUEST,
        ScheduleError::NotFound(_) => StatusCode::NOT_FOUND,
        ScheduleError::Storage(inner) => {
            error!("storage failure surfaced to the API: {:?}", inner);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::CONFLICT,
    };
    (status, err.to_string())
}

/// Extracts the acting user from the `x-user-id` header. Identity
/// verification happens upstream; the engine only records the id.
fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-user-id header is required".to_string(),
            )
        })?;
    Uuid::parse_str(raw)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid x-user-id format".to_string()))
}

//=========================================================================================
// Appointment Handlers
//=========================================================================================

/// List one dentist's appointments for a day, ordered by start time.
#[utoipa::path(
    get,
    path = "/appointments",
    params(AgendaQuery),
    responses(
        (status = 200, description = "Day agenda", body = [AppointmentResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_appointments_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<AgendaQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let agenda = app_state
        .engine
        .get_day_agenda(query.dentist_id, query.date)
        .await
        .map_err(schedule_error_response)?;
    let body: Vec<AppointmentResponse> = agenda
        .into_iter()
        .filter(|a| query.patient_id.map_or(true, |p| a.patient_id == p))
        .map(AppointmentResponse::from)
        .collect();
    Ok(Json(body))
}

/// Book a new appointment.
///
/// The booking user is taken from the `x-user-id` header. Scheduling
/// conflicts (overlap, outside working hours) answer 409.
#[utoipa::path(
    post,
    path = "/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentResponse),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "Scheduling conflict")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the booking user.")
    )
)]
pub async fn create_appointment_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let booked_by = user_id_from_headers(&headers)?;
    let appointment = app_state
        .engine
        .create_appointment(NewAppointment {
            dentist_id: req.dentist_id,
            patient_id: req.patient_id,
            start: req.start,
            duration_minutes: req.duration_minutes,
            reason: req.reason,
            booked_by,
        })
        .await
        .map_err(schedule_error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(AppointmentResponse::from(appointment)),
    ))
}

/// Cancel a pending appointment.
#[utoipa::path(
    post,
    path = "/appointments/{id}/cancel",
    request_body = CancelAppointmentRequest,
    responses(
        (status = 200, description = "Appointment cancelled", body = AppointmentResponse),
        (status = 404, description = "Unknown appointment"),
        (status = 409, description = "Appointment is not pending")
    )
)]
pub async fn cancel_appointment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelAppointmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let appointment = app_state
        .engine
        .cancel_appointment(id, req.reason)
        .await
        .map_err(schedule_error_response)?;
    Ok(Json(AppointmentResponse::from(appointment)))
}

/// Record that the patient attended; an optional note is appended.
#[utoipa::path(
    post,
    path = "/appointments/{id}/attend",
    request_body = AttendAppointmentRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = AppointmentResponse),
        (status = 404, description = "Unknown appointment"),
        (status = 409, description = "Appointment is not pending")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the recording user.")
    )
)]
pub async fn attend_appointment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<AttendAppointmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let author = user_id_from_headers(&headers)?;
    let appointment = app_state
        .engine
        .mark_attended(id, author, req.note)
        .await
        .map_err(schedule_error_response)?;
    Ok(Json(AppointmentResponse::from(appointment)))
}

/// Record that the patient did not show up.
#[utoipa::path(
    post,
    path = "/appointments/{id}/absent",
    request_body = AbsentAppointmentRequest,
    responses(
        (status = 200, description = "Absence recorded", body = AppointmentResponse),
        (status = 404, description = "Unknown appointment"),
        (status = 409, description = "Appointment is not pending")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the recording user.")
    )
)]
pub async fn absent_appointment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<AbsentAppointmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let author = user_id_from_headers(&headers)?;
    let appointment = app_state
        .engine
        .mark_absent(id, author, req.reason)
        .await
        .map_err(schedule_error_response)?;
    Ok(Json(AppointmentResponse::from(appointment)))
}

/// Move a pending appointment to a new start, keeping its duration.
#[utoipa::path(
    put,
    path = "/appointments/{id}/reschedule",
    request_body = RescheduleAppointmentRequest,
    responses(
        (status = 200, description = "Appointment rescheduled", body = AppointmentResponse),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "Unknown appointment"),
        (status = 409, description = "Scheduling conflict or not pending")
    )
)]
pub async fn reschedule_appointment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RescheduleAppointmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let appointment = app_state
        .engine
        .reschedule_appointment(id, req.new_start)
        .await
        .map_err(schedule_error_response)?;
    Ok(Json(AppointmentResponse::from(appointment)))
}

/// List the notes recorded against one appointment.
#[utoipa::path(
    get,
    path = "/appointments/{id}/notes",
    responses(
        (status = 200, description = "Appointment notes", body = [NoteResponse]),
        (status = 404, description = "Unknown appointment")
    )
)]
pub async fn list_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Surface 404 for unknown ids instead of an empty list.
    app_state
        .engine
        .get_appointment(id)
        .await
        .map_err(schedule_error_response)?;
    let notes = app_state
        .engine
        .list_notes(id)
        .await
        .map_err(schedule_error_response)?;
    let body: Vec<NoteResponse> = notes.into_iter().map(NoteResponse::from).collect();
    Ok(Json(body))
}

/// Free bookable start times for a dentist, day and duration.
#[utoipa::path(
    get,
    path = "/appointments/slots",
    params(FreeSlotsQuery),
    responses(
        (status = 200, description = "Free slots", body = FreeSlotsResponse),
        (status = 400, description = "Malformed query")
    )
)]
pub async fn free_slots_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<FreeSlotsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let step_minutes = query
        .step_minutes
        .unwrap_or(app_state.config.default_slot_step_minutes);
    let slots = app_state
        .slots
        .compute_free_slots(query.dentist_id, query.date, query.duration_minutes, step_minutes)
        .await
        .map_err(schedule_error_response)?;
    Ok(Json(FreeSlotsResponse {
        dentist_id: query.dentist_id,
        date: query.date,
        duration_minutes: query.duration_minutes,
        step_minutes,
        slots: slots.collect(),
    }))
}

//=========================================================================================
// Availability Handlers
//=========================================================================================

/// Declare a working or blocked window for a dentist.
#[utoipa::path(
    post,
    path = "/availability",
    request_body = CreateAvailabilityRequest,
    responses(
        (status = 201, description = "Window created", body = AvailabilityResponse),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "Window overlaps an existing one")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the declaring user.")
    )
)]
pub async fn create_availability_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAvailabilityRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let created_by = user_id_from_headers(&headers)?;
    let window = app_state
        .availability
        .create_availability(NewAvailability {
            dentist_id: req.dentist_id,
            date: req.date,
            start_time: req.start_time,
            end_time: req.end_time,
            kind: req.kind.into(),
            reason: req.reason,
            created_by,
        })
        .await
        .map_err(schedule_error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(AvailabilityResponse::from(window)),
    ))
}

/// List a dentist's windows for one day.
#[utoipa::path(
    get,
    path = "/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability windows", body = [AvailabilityResponse])
    )
)]
pub async fn list_availability_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let windows = app_state
        .availability
        .list_for_day(
            query.dentist_id,
            query.date,
            query.include_deleted.unwrap_or(false),
        )
        .await
        .map_err(schedule_error_response)?;
    let body: Vec<AvailabilityResponse> =
        windows.into_iter().map(AvailabilityResponse::from).collect();
    Ok(Json(body))
}

/// Remove a window. The removal is a soft delete and is refused while
/// pending appointments still fall inside the window.
#[utoipa::path(
    delete,
    path = "/availability/{id}",
    responses(
        (status = 200, description = "Window deleted"),
        (status = 404, description = "Unknown window"),
        (status = 400, description = "Window still holds pending appointments")
    )
)]
pub async fn delete_availability_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .availability
        .delete_availability(id)
        .await
        .map_err(schedule_error_response)?;
    Ok(StatusCode::OK)
}

//=========================================================================================
// Tests
//=========================================================================================
