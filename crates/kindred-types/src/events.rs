use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events published to the notification broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    /// A direct message was stored for `receiver_id`.
    #[serde(rename_all = "camelCase")]
    NewMessage {
        sender_id: Uuid,
        receiver_id: Uuid,
        message_id: Uuid,
        conversation_id: Uuid,
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl NotificationEvent {
    /// Routing key the event is published under, `messages.<receiver>`.
    pub fn routing_key(&self) -> String {
        match self {
            Self::NewMessage { receiver_id, .. } => format!("messages.{}", receiver_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_is_tagged_and_camel_cased() {
        let receiver = Uuid::new_v4();
        let event = NotificationEvent::NewMessage {
            sender_id: Uuid::new_v4(),
            receiver_id: receiver,
            message_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            content: "hello".into(),
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "NEW_MESSAGE");
        assert_eq!(value["receiverId"], receiver.to_string());
        assert_eq!(event.routing_key(), format!("messages.{}", receiver));
    }
}
