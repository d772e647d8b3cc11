//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, LogNotificationAdapter, SystemClock},
    config::Config,
    error::ApiError,
    web::{
        rest::{
            absent_appointment_handler, attend_appointment_handler, cancel_appointment_handler,
            create_appointment_handler, create_availability_handler,
            delete_availability_handler, free_slots_handler, list_appointments_handler,
            list_availability_handler, list_notes_handler, reschedule_appointment_handler,
        },
        state::AppState,
        ApiDoc,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get, post, put},
    Router,
};
use clinic_scheduling_core::{
    AvailabilityManager, DentistLocks, SchedulingEngine, SlotGenerator,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Wire the Scheduling Engine ---
    let clock = Arc::new(SystemClock);
    let dispatcher = Arc::new(LogNotificationAdapter);
    let locks = DentistLocks::new();

    let availability = Arc::new(AvailabilityManager::new(
        db_adapter.clone(),
        db_adapter.clone(),
        clock.clone(),
        locks.clone(),
        config.availability_config(),
    ));
    let engine = Arc::new(SchedulingEngine::new(
        db_adapter.clone(),
        availability.clone(),
        clock,
        dispatcher,
        locks,
        config.engine_config(),
    ));
    let slots = Arc::new(SlotGenerator::new(
        availability.clone(),
        db_adapter,
        config.engine_config(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        engine,
        availability,
        slots,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_allowed_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route(
            "/appointments",
            get(list_appointments_handler).post(create_appointment_handler),
        )
        .route("/appointments/slots", get(free_slots_handler))
        .route("/appointments/{id}/cancel", post(cancel_appointment_handler))
        .route("/appointments/{id}/attend", post(attend_appointment_handler))
        .route("/appointments/{id}/absent", post(absent_appointment_handler))
        .route(
            "/appointments/{id}/reschedule",
            put(reschedule_appointment_handler),
        )
        .route("/appointments/{id}/notes", get(list_notes_handler))
        .route(
            "/availability",
            get(list_availability_handler).post(create_availability_handler),
        )
        .route("/availability/{id}", delete(delete_availability_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
