pub mod availability;
pub mod domain;
pub mod engine;
pub mod error;
pub mod interval;
pub mod locks;
pub mod ports;
pub mod slots;

pub use availability::{AvailabilityConfig, AvailabilityManager};
pub use domain::{
    Appointment, AppointmentNote, AppointmentState, Availability, AvailabilityKind,
    NewAppointment, NewAvailability, NewNote,
};
pub use engine::{EngineConfig, SchedulingEngine};
pub use error::{ScheduleError, ScheduleResult};
pub use locks::DentistLocks;
pub use ports::{
    AppointmentEvent, AppointmentStore, AvailabilityStore, Clock, DispatchError,
    NotificationDispatcher, StoreError, StoreResult,
};
pub use slots::{FreeSlots, SlotGenerator};
