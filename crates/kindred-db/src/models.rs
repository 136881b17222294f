//! Database row types. These map directly to SQLite rows.
//! Distinct from kindred-types API models to keep the DB layer independent.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use kindred_types::models::{
    AccountStatus, ConversationStatus, FavouriteGame, Gender, MessageStatus, MessageType,
    ZodiacSign,
};

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    /// Argon2 PHC string, never plaintext.
    pub password: String,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewAccount<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub zodiac_sign: Option<ZodiacSign>,
    pub date_of_birth: Option<NaiveDate>,
    pub horoscope: Option<String>,
    pub profile_image_url: Option<String>,
    pub gallery_image_urls: Vec<String>,
    pub gender: Option<Gender>,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub education: Option<String>,
    pub interests: Vec<String>,
    pub favourite_games: Vec<FavouriteGame>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// Blank profile for `account_id`; callers fill in the submitted fields.
    pub fn empty(id: Uuid, account_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id,
            display_name: None,
            bio: None,
            height: None,
            weight: None,
            zodiac_sign: None,
            date_of_birth: None,
            horoscope: None,
            profile_image_url: None,
            gallery_image_urls: Vec::new(),
            gender: None,
            location: None,
            occupation: None,
            education: None,
            interests: Vec::new(),
            favourite_games: Vec::new(),
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticipantRow {
    pub account_id: Uuid,
    /// Joined from `accounts`; `None` if the account no longer exists.
    pub username: Option<String>,
    pub email: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub is_muted: bool,
}

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub id: Uuid,
    pub participants: Vec<ParticipantRow>,
    pub last_message: Option<String>,
    pub last_message_id: Option<Uuid>,
    pub last_message_at: DateTime<Utc>,
    pub status: ConversationStatus,
    pub message_count: u64,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRow {
    pub fn has_participant(&self, account_id: Uuid) -> bool {
        self.participants.iter().any(|p| p.account_id == account_id)
    }
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub attachments: Vec<String>,
    pub status: MessageStatus,
    pub read_at: Option<DateTime<Utc>>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub reply_to_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reactions: Vec<ReactionRow>,
}

pub struct NewMessage<'a> {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: &'a str,
    pub message_type: MessageType,
    pub attachments: &'a [String],
    pub reply_to_id: Option<Uuid>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRow {
    pub message_id: Uuid,
    pub account_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}
