//! services/api/src/adapters/clock.rs
//!
//! The concrete implementation of the `Clock` port: clinic-local wall
//! time. All scheduling times are naive local date-times for the single
//! clinic.

use chrono::NaiveDateTime;
use clinic_scheduling_core::ports::Clock;

#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
