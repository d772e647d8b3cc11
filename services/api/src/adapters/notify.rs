//! services/api/src/adapters/notify.rs
//!
//! A logging implementation of the `NotificationDispatcher` port. The
//! real delivery channels (email, SMS, app push) live in a separate
//! notification service; this adapter records the event stream so the
//! scheduling engine stays decoupled from delivery concerns.

use async_trait::async_trait;
use clinic_scheduling_core::ports::{AppointmentEvent, DispatchError, NotificationDispatcher};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct LogNotificationAdapter;

#[async_trait]
impl NotificationDispatcher for LogNotificationAdapter {
    async fn dispatch(
        &self,
        appointment_id: Uuid,
        event: AppointmentEvent,
    ) -> Result<(), DispatchError> {
        info!(appointment_id = %appointment_id, ?event, "scheduling event dispatched");
        Ok(())
    }
}
