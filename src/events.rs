//! In-process notifications about progress changes.
//!
//! Handlers publish after a successful write; any number of listeners can
//! subscribe. Nothing is persisted and slow listeners may miss events.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    VideoCompleted {
        user_id: String,
        training_id: String,
    },
    WorksheetSubmitted {
        user_id: String,
        training_id: String,
        bold_action_id: String,
    },
    BoldActionCompleted {
        user_id: String,
        bold_action_id: String,
    },
    StandupScheduled {
        standup_id: String,
        supervisor_id: String,
        team_member_id: String,
    },
    StandupCompleted {
        standup_id: String,
        supervisor_id: String,
        team_member_id: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus { sender }
    }

    /// Returns how many listeners received the event.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

/// Logs every event until the bus is dropped.
pub async fn log_events(mut receiver: broadcast::Receiver<ProgressEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => tracing::info!(?event, "progress event"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event listener lagged behind")
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(id: &str) -> ProgressEvent {
        ProgressEvent::BoldActionCompleted {
            user_id: "u1".to_string(),
            bold_action_id: id.to_string(),
        }
    }

    #[actix_web::test]
    async fn delivers_to_every_subscriber() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish(completed("b1")), 2);
        assert_eq!(first.recv().await.unwrap(), completed("b1"));
        assert_eq!(second.recv().await.unwrap(), completed("b1"));
    }

    #[test]
    fn publishing_without_listeners_is_not_an_error() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(completed("b1")), 0);
    }

    #[actix_web::test]
    async fn logger_stops_when_the_bus_is_dropped() {
        let bus = EventBus::new(4);
        let receiver = bus.subscribe();
        bus.publish(completed("b1"));
        drop(bus);
        log_events(receiver).await;
    }

    #[test]
    fn serializes_with_a_type_tag() {
        let json = serde_json::to_value(completed("b1")).unwrap();
        assert_eq!(json["type"], "bold_action_completed");
        assert_eq!(json["bold_action_id"], "b1");
    }
}
