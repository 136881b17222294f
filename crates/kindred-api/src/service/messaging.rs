use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use kindred_db::Database;
use kindred_db::models::{ConversationRow, MessageRow, NewMessage, ReactionRow};
use kindred_types::api::{
    ConversationPage, ConversationSummary, EditMessageRequest, EditedMessage, MessagePage,
    MessageResponse, ParticipantSummary, SendMessageRequest,
};
use kindred_types::events::NotificationEvent;
use kindred_types::models::{ConversationStatus, Reaction};
use kindred_types::validation::{Validate, validate_emoji};

use super::blocking;
use crate::error::{ApiError, ApiResult};
use crate::notify::EventPublisher;

pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;
pub const MAX_MESSAGE_LIMIT: u32 = 200;
pub const DEFAULT_CONVERSATION_LIMIT: u32 = 20;
pub const MAX_CONVERSATION_LIMIT: u32 = 100;

/// How long a send waits on the broker before giving up on the notification.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

pub struct MessagingService {
    db: Arc<Database>,
    publisher: Arc<dyn EventPublisher>,
    publish_timeout: Duration,
}

impl MessagingService {
    pub fn new(db: Arc<Database>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            db,
            publisher,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Stores the message in the pair's conversation, creating it on first
    /// contact, then publishes a notification. A failed or stalled publish is
    /// logged and never fails the send.
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        req: SendMessageRequest,
    ) -> ApiResult<MessageResponse> {
        req.validate()?;
        let receiver_id = req.receiver_id;
        if sender_id == receiver_id {
            return Err(ApiError::Validation("Cannot send message to yourself".into()));
        }

        let receiver_exists = blocking(&self.db, move |db| db.get_account_by_id(receiver_id))
            .await?
            .is_some();
        if !receiver_exists {
            return Err(ApiError::NotFound("Receiver not found".into()));
        }

        let (conversation, created) = blocking(&self.db, move |db| {
            db.find_or_create_conversation(sender_id, receiver_id, Utc::now())
        })
        .await?;
        if created {
            info!("Started conversation {} between {} and {}", conversation.id, sender_id, receiver_id);
        }
        if conversation.is_blocked {
            return Err(ApiError::Forbidden("This conversation is blocked".into()));
        }

        let conversation_id = conversation.id;
        let message = blocking(&self.db, move |db| {
            db.insert_message(&NewMessage {
                id: Uuid::new_v4(),
                conversation_id,
                sender_id,
                receiver_id,
                content: &req.content,
                message_type: req.message_type,
                attachments: &req.attachments,
                reply_to_id: req.reply_to_id,
                now: Utc::now(),
            })
        })
        .await?;

        let event = NotificationEvent::NewMessage {
            sender_id,
            receiver_id,
            message_id: message.id,
            conversation_id,
            content: message.content.clone(),
            timestamp: message.created_at,
        };
        let routing_key = event.routing_key();
        let publish = self.publisher.publish(&routing_key, &event);
        match tokio::time::timeout(self.publish_timeout, publish).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Notification for message {} not published: {}", message.id, e),
            Err(_) => warn!(
                "Notification for message {} timed out after {:?}",
                message.id, self.publish_timeout
            ),
        }

        debug!("Message {} sent in conversation {}", message.id, conversation_id);
        Ok(message_response(message))
    }

    /// One page of the conversation, newest first. Everything addressed to
    /// the caller in this conversation is marked READ first.
    pub async fn view_messages(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ApiResult<MessagePage> {
        let conversation = self.conversation(conversation_id).await?;
        if !conversation.has_participant(user_id) {
            return Err(ApiError::Validation(
                "You are not a participant in this conversation".into(),
            ));
        }

        let limit = clamp_limit(limit, DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT);
        let offset = offset.unwrap_or(0);

        let (messages, total_messages) = blocking(&self.db, move |db| {
            let marked = db.mark_conversation_read(conversation_id, user_id, Utc::now())?;
            if marked > 0 {
                debug!("Marked {} messages read in {}", marked, conversation_id);
            }
            let messages = db.list_messages(conversation_id, limit, offset)?;
            let total = db.count_messages(conversation_id)?;
            Ok((messages, total))
        })
        .await?;

        Ok(MessagePage {
            conversation_id,
            total_messages,
            messages: messages.into_iter().map(message_response).collect(),
        })
    }

    /// ACTIVE conversations of `user_id`, most recent activity first.
    pub async fn get_conversations(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ApiResult<ConversationPage> {
        let limit = clamp_limit(limit, DEFAULT_CONVERSATION_LIMIT, MAX_CONVERSATION_LIMIT);
        let offset = offset.unwrap_or(0);

        let (rows, total) = blocking(&self.db, move |db| {
            let rows = db.list_conversations(user_id, ConversationStatus::Active, limit, offset)?;
            let total = db.count_conversations(user_id, ConversationStatus::Active)?;
            Ok((rows, total))
        })
        .await?;

        Ok(ConversationPage {
            total,
            conversations: rows.into_iter().map(conversation_summary).collect(),
        })
    }

    pub async fn add_reaction(
        &self,
        user_id: Uuid,
        message_id: Uuid,
        emoji: &str,
    ) -> ApiResult<Vec<Reaction>> {
        validate_emoji(emoji)?;
        self.reactable_message(user_id, message_id).await?;

        let emoji = emoji.to_string();
        let (added, reactions) = blocking(&self.db, move |db| {
            let added = db.add_reaction(message_id, user_id, &emoji, Utc::now())?;
            Ok((added, db.get_reactions(message_id)?))
        })
        .await?;
        if !added {
            return Err(ApiError::Conflict("You already reacted with this emoji".into()));
        }

        Ok(reactions.into_iter().map(reaction).collect())
    }

    /// Removing a reaction that is not there is a no-op.
    pub async fn remove_reaction(
        &self,
        user_id: Uuid,
        message_id: Uuid,
        emoji: &str,
    ) -> ApiResult<Vec<Reaction>> {
        validate_emoji(emoji)?;
        self.reactable_message(user_id, message_id).await?;

        let emoji = emoji.to_string();
        let reactions = blocking(&self.db, move |db| {
            db.remove_reaction(message_id, user_id, &emoji)?;
            db.get_reactions(message_id)
        })
        .await?;

        Ok(reactions.into_iter().map(reaction).collect())
    }

    pub async fn edit_message(
        &self,
        user_id: Uuid,
        message_id: Uuid,
        req: EditMessageRequest,
    ) -> ApiResult<EditedMessage> {
        req.validate()?;
        let message = self.message(message_id).await?;
        if message.sender_id != user_id {
            return Err(ApiError::Forbidden("You can only edit your own messages".into()));
        }

        let edited_at = Utc::now();
        let content = req.content;
        let stored = content.clone();
        blocking(&self.db, move |db| db.update_message_content(message_id, &stored, edited_at))
            .await?;

        Ok(EditedMessage {
            id: message_id,
            content,
            is_edited: true,
            edited_at: Some(edited_at),
        })
    }

    pub async fn delete_message(&self, user_id: Uuid, message_id: Uuid) -> ApiResult<()> {
        let message = self.message(message_id).await?;
        if message.sender_id != user_id {
            return Err(ApiError::Forbidden("You can only delete your own messages".into()));
        }

        let deleted = blocking(&self.db, move |db| db.delete_message(message_id, Utc::now())).await?;
        if !deleted {
            return Err(ApiError::NotFound("Message not found".into()));
        }
        info!("Message {} deleted by {}", message_id, user_id);
        Ok(())
    }

    pub async fn block_user(&self, user_id: Uuid, other_id: Uuid) -> ApiResult<()> {
        self.set_blocked(user_id, other_id, true).await
    }

    pub async fn unblock_user(&self, user_id: Uuid, other_id: Uuid) -> ApiResult<()> {
        self.set_blocked(user_id, other_id, false).await
    }

    async fn set_blocked(&self, user_id: Uuid, other_id: Uuid, blocked: bool) -> ApiResult<()> {
        let conversation = blocking(&self.db, move |db| db.find_conversation_between(user_id, other_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Conversation not found".into()))?;

        let id = conversation.id;
        blocking(&self.db, move |db| db.set_conversation_blocked(id, blocked, Utc::now())).await?;
        info!(
            "Conversation {} {} by {}",
            id,
            if blocked { "blocked" } else { "unblocked" },
            user_id
        );
        Ok(())
    }

    async fn conversation(&self, id: Uuid) -> ApiResult<ConversationRow> {
        blocking(&self.db, move |db| db.get_conversation(id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Conversation not found".into()))
    }

    async fn message(&self, id: Uuid) -> ApiResult<MessageRow> {
        blocking(&self.db, move |db| db.get_message(id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Message not found".into()))
    }

    /// Only the sender and receiver may react to a message.
    async fn reactable_message(&self, user_id: Uuid, message_id: Uuid) -> ApiResult<MessageRow> {
        let message = self.message(message_id).await?;
        if message.sender_id != user_id && message.receiver_id != user_id {
            return Err(ApiError::Forbidden(
                "You can only react to messages in your conversations".into(),
            ));
        }
        Ok(message)
    }
}

fn clamp_limit(requested: Option<u32>, default: u32, max: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, max)
}

fn reaction(row: ReactionRow) -> Reaction {
    Reaction {
        user_id: row.account_id,
        emoji: row.emoji,
        created_at: row.created_at,
    }
}

fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: row.id,
        conversation_id: row.conversation_id,
        sender_id: row.sender_id,
        receiver_id: row.receiver_id,
        content: row.content,
        message_type: row.message_type,
        status: row.status,
        read_at: row.read_at,
        attachments: row.attachments,
        reactions: row.reactions.into_iter().map(reaction).collect(),
        is_edited: row.is_edited,
        edited_at: row.edited_at,
        reply_to_id: row.reply_to_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn conversation_summary(row: ConversationRow) -> ConversationSummary {
    ConversationSummary {
        id: row.id,
        participants: row
            .participants
            .into_iter()
            .map(|p| ParticipantSummary {
                user_id: p.account_id,
                username: p.username,
                email: p.email,
                joined_at: p.joined_at,
                is_muted: p.is_muted,
            })
            .collect(),
        last_message: row.last_message,
        last_message_id: row.last_message_id,
        last_message_at: row.last_message_at,
        message_count: row.message_count,
        status: row.status,
        is_blocked: row.is_blocked,
    }
}
