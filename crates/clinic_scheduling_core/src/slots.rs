//! crates/clinic_scheduling_core/src/slots.rs
//!
//! Derives free bookable start times for a dentist/day/duration from the
//! working windows minus the booked appointments. The computation reads
//! once and then yields lazily, so consumers may take a prefix without
//! realizing the whole sequence.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Timelike};
use uuid::Uuid;

use crate::availability::AvailabilityManager;
use crate::engine::EngineConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::interval;
use crate::ports::AppointmentStore;

pub struct SlotGenerator {
    availability: Arc<AvailabilityManager>,
    appointments: Arc<dyn AppointmentStore>,
    config: EngineConfig,
}

impl SlotGenerator {
    pub fn new(
        availability: Arc<AvailabilityManager>,
        appointments: Arc<dyn AppointmentStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            availability,
            appointments,
            config,
        }
    }

    /// Computes the free start times for booking `duration_minutes` on
    /// one dentist/day, walking candidates in `step_minutes` increments.
    ///
    /// Returns a lazy iterator over ascending start times; cloning it
    /// restarts the walk. Re-running with unchanged stored intervals
    /// yields the identical sequence.
    pub async fn compute_free_slots(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        duration_minutes: u32,
        step_minutes: u32,
    ) -> ScheduleResult<FreeSlots> {
        if duration_minutes == 0 || duration_minutes % self.config.granularity_minutes != 0 {
            return Err(ScheduleError::Validation(format!(
                "duration must be a positive multiple of {} minutes",
                self.config.granularity_minutes
            )));
        }
        if step_minutes == 0 {
            return Err(ScheduleError::Validation(
                "step must be a positive number of minutes".to_string(),
            ));
        }

        let windows = self
            .availability
            .list_working_windows(dentist_id, date)
            .await?
            .into_iter()
            .map(|(start, end)| (minutes_of(start), minutes_of(end)))
            .collect();

        // Appointments never cross midnight, so clamping to the day is a
        // plain time-of-day projection.
        let busy = self
            .appointments
            .list_for_day(dentist_id, date)
            .await
            .map_err(ScheduleError::from_store)?
            .into_iter()
            .filter(|a| a.is_active())
            .map(|a| {
                (
                    minutes_of(a.start.time()),
                    minutes_of(a.start.time()) + a.duration_minutes,
                )
            })
            .collect();

        Ok(FreeSlots {
            windows,
            busy,
            duration: duration_minutes,
            step: step_minutes,
            window_idx: 0,
            cursor: None,
        })
    }
}

/// Lazy, finite walk over candidate start times. All arithmetic is in
/// whole minutes from midnight, which keeps the walk free of time-of-day
/// wraparound.
#[derive(Debug, Clone)]
pub struct FreeSlots {
    windows: Vec<(u32, u32)>,
    busy: Vec<(u32, u32)>,
    duration: u32,
    step: u32,
    window_idx: usize,
    cursor: Option<u32>,
}

impl Iterator for FreeSlots {
    type Item = NaiveTime;

    fn next(&mut self) -> Option<NaiveTime> {
        while self.window_idx < self.windows.len() {
            let (w_start, w_end) = self.windows[self.window_idx];
            let candidate = self.cursor.unwrap_or(w_start);
            let candidate_end = candidate + self.duration;

            if !interval::contains(w_start, w_end, candidate, candidate_end) {
                self.window_idx += 1;
                self.cursor = None;
                continue;
            }
            self.cursor = Some(candidate + self.step);

            let free = self
                .busy
                .iter()
                .all(|&(b_start, b_end)| !interval::overlaps(candidate, candidate_end, b_start, b_end));
            if free {
                return time_of(candidate);
            }
        }
        None
    }
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}

fn time_of(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}
