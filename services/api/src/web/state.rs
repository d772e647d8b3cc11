//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use clinic_scheduling_core::{AvailabilityManager, SchedulingEngine, SlotGenerator};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SchedulingEngine>,
    pub availability: Arc<AvailabilityManager>,
    pub slots: Arc<SlotGenerator>,
    pub config: Arc<Config>,
}
