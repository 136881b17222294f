//! Explicit per-request validation.
//!
//! Each request DTO implements [`Validate`], collecting every failing field
//! instead of stopping at the first one, so clients can fix a form in one go.

use std::fmt;

use serde::Serialize;
use validator::{ValidateEmail, ValidateUrl};

use crate::api::{
    EditMessageRequest, LoginRequest, ProfileFields, ReactionRequest, RegisterRequest,
    SendMessageRequest,
};

const PASSWORD_SPECIALS: &str = "@$!%*?&";
const MAX_EMOJI_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Accumulates field errors for one request.
#[derive(Default)]
struct Errors(Vec<FieldError>);

impl Errors {
    fn check(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.0.push(FieldError::new(field, message));
        }
    }

    fn max_len(&mut self, value: &Option<String>, field: &'static str, max: usize) {
        if let Some(v) = value {
            self.check(
                v.chars().count() <= max,
                field,
                &format!("must not exceed {} characters", max),
            );
        }
    }

    fn range(&mut self, value: Option<f64>, field: &'static str, min: f64, max: f64) {
        if let Some(v) = value {
            self.check(
                v.is_finite() && v >= min && v <= max,
                field,
                &format!("must be between {} and {}", min, max),
            );
        }
    }

    fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.0.is_empty() { Ok(()) } else { Err(self.0) }
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Errors::default();

        errors.check(self.email.trim().validate_email(), "email", "must be a valid email address");

        let name_len = self.username.chars().count();
        errors.check(
            (3..=30).contains(&name_len),
            "username",
            "must be between 3 and 30 characters",
        );
        errors.check(
            self.username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "username",
            "can only contain letters, numbers, and underscores",
        );

        let pw = &self.password;
        errors.check(pw.chars().count() >= 8, "password", "must be at least 8 characters long");
        errors.check(
            pw.chars().any(|c| c.is_ascii_lowercase())
                && pw.chars().any(|c| c.is_ascii_uppercase())
                && pw.chars().any(|c| c.is_ascii_digit())
                && pw.chars().any(|c| PASSWORD_SPECIALS.contains(c)),
            "password",
            "must contain uppercase, lowercase, number, and special character",
        );

        errors.finish()
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Errors::default();
        errors.check(self.email.trim().validate_email(), "email", "must be a valid email address");
        errors.check(!self.password.is_empty(), "password", "is required");
        errors.finish()
    }
}

impl Validate for ProfileFields {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Errors::default();

        errors.max_len(&self.display_name, "displayName", 100);
        errors.max_len(&self.bio, "bio", 500);
        errors.max_len(&self.location, "location", 200);
        errors.max_len(&self.occupation, "occupation", 200);
        errors.max_len(&self.education, "education", 300);
        errors.range(self.height, "height", 1.0, 300.0);
        errors.range(self.weight, "weight", 1.0, 500.0);

        if let Some(url) = &self.profile_image_url {
            errors.check(url.validate_url(), "profileImageUrl", "must be a valid URL");
        }
        if let Some(urls) = &self.gallery_image_urls {
            errors.check(
                urls.iter().all(|u| !is_blank(u)),
                "galleryImageUrls",
                "must not contain empty entries",
            );
        }
        if let Some(interests) = &self.interests {
            errors.check(
                interests.iter().all(|i| !is_blank(i)),
                "interests",
                "must not contain empty entries",
            );
        }
        if let Some(games) = &self.favourite_games {
            for game in games {
                errors.check(!is_blank(&game.id), "favouriteGames", "id is required");
                errors.check(!is_blank(&game.name), "favouriteGames", "name is required");
                errors.check(
                    game.image_url.validate_url(),
                    "favouriteGames",
                    "image_url must be a valid URL",
                );
            }
        }

        errors.finish()
    }
}

impl Validate for SendMessageRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Errors::default();
        errors.check(!is_blank(&self.content), "content", "message content is required");
        errors.check(
            self.attachments.iter().all(|a| !is_blank(a)),
            "attachments",
            "must not contain empty entries",
        );
        errors.finish()
    }
}

impl Validate for EditMessageRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Errors::default();
        errors.check(!is_blank(&self.content), "content", "message content is required");
        errors.finish()
    }
}

impl Validate for ReactionRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        validate_emoji(&self.emoji)
    }
}

/// Shared by the JSON body (add) and the query string (remove).
pub fn validate_emoji(emoji: &str) -> Result<(), Vec<FieldError>> {
    let mut errors = Errors::default();
    errors.check(!is_blank(emoji), "emoji", "is required");
    errors.check(emoji.len() <= MAX_EMOJI_BYTES, "emoji", "is too long");
    errors.finish()
}
