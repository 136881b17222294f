//! Best-effort notification publishing over Redis pub/sub.
//!
//! Events are published to `<exchange>:<routing key>`; consumers bound to a
//! queue subscribe to the pattern `<exchange>:<queue>.*`, which with the
//! default queue name `messages` matches `messages.<receiver id>`.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use kindred_types::events::NotificationEvent;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("notification broker is not connected")]
    NotConnected,

    #[error("broker error: {0}")]
    Broker(#[from] redis::RedisError),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, routing_key: &str, event: &NotificationEvent) -> Result<(), PublishError>;
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub exchange: String,
    pub queue: String,
}

impl BrokerConfig {
    pub fn channel_for(&self, routing_key: &str) -> String {
        format!("{}:{}", self.exchange, routing_key)
    }

    /// Pattern matching every routing key bound to the queue.
    pub fn binding_pattern(&self) -> String {
        format!("{}:{}.*", self.exchange, self.queue)
    }
}

struct Connected {
    client: Client,
    conn: ConnectionManager,
}

/// One shared broker connection per process.
pub struct BrokerPublisher {
    config: Option<BrokerConfig>,
    connected: RwLock<Option<Connected>>,
}

impl BrokerPublisher {
    pub fn new(config: Option<BrokerConfig>) -> Self {
        Self {
            config,
            connected: RwLock::new(None),
        }
    }

    /// Publisher that never connects; every publish reports `NotConnected`.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn config(&self) -> Option<&BrokerConfig> {
        self.config.as_ref()
    }

    /// Opens the shared connection. Calling it again while connected is a no-op.
    pub async fn connect(&self) -> Result<(), PublishError> {
        let Some(config) = &self.config else {
            return Err(PublishError::NotConnected);
        };

        let mut guard = self.connected.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let client = Client::open(config.url.as_str())?;
        let mut conn = ConnectionManager::new(client.clone()).await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!(
            exchange = %config.exchange,
            binding = %config.binding_pattern(),
            "Notification broker connected"
        );
        *guard = Some(Connected { client, conn });
        Ok(())
    }

    pub async fn close(&self) {
        if self.connected.write().await.take().is_some() {
            info!("Notification broker connection closed");
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.connected.read().await.is_some()
    }

    /// Consumes events bound to the configured queue, handing each decoded
    /// event to `handler`. Payloads that fail to decode are logged and skipped.
    pub async fn subscribe<F, Fut>(&self, handler: F) -> Result<JoinHandle<()>, PublishError>
    where
        F: Fn(NotificationEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (Some(config), Some(client)) = (
            self.config.clone(),
            self.connected.read().await.as_ref().map(|c| c.client.clone()),
        ) else {
            return Err(PublishError::NotConnected);
        };

        let mut pubsub = client.get_async_pubsub().await?;
        let pattern = config.binding_pattern();
        pubsub.psubscribe(&pattern).await?;
        info!(pattern = %pattern, "Subscribed to notification events");

        Ok(tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "Unreadable notification payload");
                        continue;
                    }
                };
                match serde_json::from_str::<NotificationEvent>(&payload) {
                    Ok(event) => handler(event).await,
                    Err(e) => warn!(error = %e, "Skipping malformed notification event"),
                }
            }
            debug!("Notification subscription ended");
        }))
    }
}

#[async_trait]
impl EventPublisher for BrokerPublisher {
    async fn publish(&self, routing_key: &str, event: &NotificationEvent) -> Result<(), PublishError> {
        let (Some(config), Some(mut conn)) = (
            self.config.as_ref(),
            self.connected.read().await.as_ref().map(|c| c.conn.clone()),
        ) else {
            return Err(PublishError::NotConnected);
        };

        let payload = serde_json::to_string(event)?;
        let channel = config.channel_for(routing_key);
        let receivers: usize = conn.publish(&channel, payload).await?;

        debug!(channel = %channel, receivers, "Notification published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn config() -> BrokerConfig {
        BrokerConfig {
            url: "redis://127.0.0.1:6379".into(),
            exchange: "kindred.events".into(),
            queue: "messages".into(),
        }
    }

    #[test]
    fn routing_keys_fall_under_the_queue_binding() {
        let cfg = config();
        assert_eq!(cfg.channel_for("messages.abc"), "kindred.events:messages.abc");
        assert_eq!(cfg.binding_pattern(), "kindred.events:messages.*");
    }

    #[tokio::test]
    async fn unconnected_publisher_reports_not_connected() {
        let publisher = BrokerPublisher::new(Some(config()));
        let event = NotificationEvent::NewMessage {
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            content: "hi".into(),
            timestamp: Utc::now(),
        };

        assert!(!publisher.is_ready().await);
        let err = publisher.publish(&event.routing_key(), &event).await.unwrap_err();
        assert!(matches!(err, PublishError::NotConnected));
    }

    #[tokio::test]
    async fn disabled_publisher_refuses_to_connect() {
        let publisher = BrokerPublisher::disabled();
        assert!(matches!(publisher.connect().await, Err(PublishError::NotConnected)));
        publisher.close().await;
        assert!(!publisher.is_ready().await);
    }
}
