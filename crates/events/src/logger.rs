//! Trace-log subscriber for studio events.

use tokio::sync::broadcast;

use crate::bus::StudioEvent;

/// Background task writing every bus event to the trace log.
pub struct EventLogger;

impl EventLogger {
    /// Run until the bus is dropped. Returns the number of events logged.
    pub async fn run(mut receiver: broadcast::Receiver<StudioEvent>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        project_id = event.project_id,
                        entity = event.source_entity_type.as_deref().unwrap_or("-"),
                        entity_id = event.source_entity_id,
                        "Studio event"
                    );
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
        logged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn logger_stops_when_bus_is_dropped() {
        let bus = EventBus::default();
        let handle = tokio::spawn(EventLogger::run(bus.subscribe()));

        bus.publish(StudioEvent::new("media.submitted", 1));
        bus.publish(StudioEvent::new("media.running", 1));
        drop(bus);

        assert_eq!(handle.await.unwrap(), 2);
    }
}
