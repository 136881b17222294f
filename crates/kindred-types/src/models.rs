use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted string is not a member of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a SCREAMING_SNAKE_CASE string enum with `as_str`, `Display`
/// and `FromStr`, so the same spelling is used on the wire and in SQLite.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $kind:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    AccountStatus: "account status" {
        Active => "ACTIVE",
        Inactive => "INACTIVE",
        Suspended => "SUSPENDED",
    }
}

string_enum! {
    /// The twelve western zodiac signs, in calendar order starting at Aries.
    ZodiacSign: "zodiac sign" {
        Aries => "ARIES",
        Taurus => "TAURUS",
        Gemini => "GEMINI",
        Cancer => "CANCER",
        Leo => "LEO",
        Virgo => "VIRGO",
        Libra => "LIBRA",
        Scorpio => "SCORPIO",
        Sagittarius => "SAGITTARIUS",
        Capricorn => "CAPRICORN",
        Aquarius => "AQUARIUS",
        Pisces => "PISCES",
    }
}

string_enum! {
    Gender: "gender" {
        Male => "MALE",
        Female => "FEMALE",
        Other => "OTHER",
    }
}

string_enum! {
    MessageType: "message type" {
        Text => "TEXT",
        Image => "IMAGE",
        File => "FILE",
        Audio => "AUDIO",
        Video => "VIDEO",
    }
}

string_enum! {
    /// Delivery state of a message. `Delivered` is reserved for a future
    /// delivery acknowledgement; nothing produces it yet.
    MessageStatus: "message status" {
        Sent => "SENT",
        Delivered => "DELIVERED",
        Read => "READ",
    }
}

string_enum! {
    ConversationStatus: "conversation status" {
        Active => "ACTIVE",
        Archived => "ARCHIVED",
        Deleted => "DELETED",
    }
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Text
    }
}

impl MessageStatus {
    /// Unread from the receiver's point of view.
    pub fn is_unread(&self) -> bool {
        matches!(self, MessageStatus::Sent | MessageStatus::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FavouriteGame {
    pub id: String,
    pub name: String,
    pub image_url: String,
}

/// One emoji reaction. At most one per (user, emoji) on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}
