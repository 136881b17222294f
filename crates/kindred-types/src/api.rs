use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AccountStatus, ConversationStatus, FavouriteGame, Gender, MessageStatus, MessageType, Reaction,
    ZodiacSign,
};

// -- JWT Claims --

/// Bearer token payload. `sub` is the account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Envelopes --

/// `{ "message": ..., "data": ... }` wrapper used by most endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Body for operations that only confirm success.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account, never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: AccountSummary,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Profiles --

/// Body of both createProfile and updateProfile. Every field is optional;
/// on update an omitted field leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileFields {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub zodiac_sign: Option<ZodiacSign>,
    #[serde(default, with = "birth_date")]
    pub date_of_birth: Option<NaiveDate>,
    pub profile_image_url: Option<String>,
    pub gallery_image_urls: Option<Vec<String>>,
    pub gender: Option<Gender>,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub education: Option<String>,
    pub interests: Option<Vec<String>>,
    pub favourite_games: Option<Vec<FavouriteGame>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub user_id: Uuid,
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

/// Accepts either a calendar date (`1995-05-15`) or a full RFC 3339
/// timestamp (`1995-05-15T00:00:00Z`); only the UTC date is kept.
mod birth_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
            return Ok(Some(ts.date_naive()));
        }
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| D::Error::custom("dateOfBirth must be a valid date"))
    }
}

// -- Messages --

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub reply_to_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub read_at: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
    pub reactions: Vec<Reaction>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub reply_to_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub conversation_id: Uuid,
    pub total_messages: u64,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedMessage {
    pub id: Uuid,
    pub content: String,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionRequest {
    pub emoji: String,
}

// -- Conversations --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub email: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub is_muted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub participants: Vec<ParticipantSummary>,
    pub last_message: Option<String>,
    pub last_message_id: Option<Uuid>,
    pub last_message_at: DateTime<Utc>,
    pub message_count: u64,
    pub status: ConversationStatus,
    pub is_blocked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPage {
    pub total: u64,
    pub conversations: Vec<ConversationSummary>,
}
