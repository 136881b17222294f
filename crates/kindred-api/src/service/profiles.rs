use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use kindred_db::models::ProfileRow;
use kindred_db::{Database, is_foreign_key_violation, is_unique_violation};
use kindred_types::api::{ProfileFields, ProfileResponse};
use kindred_types::validation::Validate;

use super::blocking;
use crate::error::{ApiError, ApiResult};
use crate::zodiac;

const ALREADY_EXISTS: &str = "Profile already exists for this user";

pub struct ProfileService {
    db: Arc<Database>,
}

impl ProfileService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// An explicit zodiac sign wins over one derived from the birth date.
    pub async fn create_profile(
        &self,
        account_id: Uuid,
        fields: ProfileFields,
    ) -> ApiResult<ProfileResponse> {
        fields.validate()?;

        let exists = blocking(&self.db, move |db| db.get_profile_by_account(account_id))
            .await?
            .is_some();
        if exists {
            return Err(ApiError::Validation(ALREADY_EXISTS.into()));
        }

        let mut profile = ProfileRow::empty(Uuid::new_v4(), account_id, Utc::now());
        let sign = fields
            .zodiac_sign
            .or_else(|| fields.date_of_birth.map(zodiac::sign_for));
        merge(&mut profile, fields);
        if let Some(sign) = sign {
            profile.zodiac_sign = Some(sign);
            profile.horoscope = Some(zodiac::horoscope(sign).to_string());
        }

        let stored = profile.clone();
        blocking(&self.db, move |db| db.insert_profile(&stored))
            .await
            .map_err(|e| match e {
                ApiError::Internal(err) if is_unique_violation(&err) => {
                    ApiError::Validation(ALREADY_EXISTS.into())
                }
                ApiError::Internal(err) if is_foreign_key_violation(&err) => {
                    ApiError::NotFound("User not found".into())
                }
                other => other,
            })?;

        info!("Created profile {} for account {}", profile.id, account_id);
        Ok(to_response(profile))
    }

    pub async fn get_profile(&self, account_id: Uuid) -> ApiResult<ProfileResponse> {
        blocking(&self.db, move |db| db.get_profile_by_account(account_id))
            .await?
            .map(to_response)
            .ok_or_else(|| ApiError::NotFound("Profile not found".into()))
    }

    pub async fn get_profile_by_id(&self, profile_id: Uuid) -> ApiResult<ProfileResponse> {
        blocking(&self.db, move |db| db.get_profile_by_id(profile_id))
            .await?
            .map(to_response)
            .ok_or_else(|| ApiError::NotFound("Profile not found".into()))
    }

    /// Shallow merge of the supplied fields. A new birth date re-derives the
    /// sign even when an explicit sign is passed alongside it.
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        fields: ProfileFields,
    ) -> ApiResult<ProfileResponse> {
        fields.validate()?;

        let mut profile = blocking(&self.db, move |db| db.get_profile_by_account(account_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

        let sign = fields
            .date_of_birth
            .map(zodiac::sign_for)
            .or(fields.zodiac_sign);
        merge(&mut profile, fields);
        if let Some(sign) = sign {
            profile.zodiac_sign = Some(sign);
            profile.horoscope = Some(zodiac::horoscope(sign).to_string());
        }
        profile.updated_at = Utc::now();

        let stored = profile.clone();
        blocking(&self.db, move |db| db.update_profile(&stored)).await?;

        Ok(to_response(profile))
    }
}

/// Copies every supplied field except the zodiac pair, which callers resolve.
fn merge(profile: &mut ProfileRow, fields: ProfileFields) {
    let ProfileFields {
        display_name,
        bio,
        height,
        weight,
        zodiac_sign: _,
        date_of_birth,
        profile_image_url,
        gallery_image_urls,
        gender,
        location,
        occupation,
        education,
        interests,
        favourite_games,
        is_public,
    } = fields;

    fn set<T>(slot: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            *slot = value;
        }
    }

    set(&mut profile.display_name, display_name);
    set(&mut profile.bio, bio);
    set(&mut profile.height, height);
    set(&mut profile.weight, weight);
    set(&mut profile.date_of_birth, date_of_birth);
    set(&mut profile.profile_image_url, profile_image_url);
    set(&mut profile.gender, gender);
    set(&mut profile.location, location);
    set(&mut profile.occupation, occupation);
    set(&mut profile.education, education);

    if let Some(urls) = gallery_image_urls {
        profile.gallery_image_urls = urls;
    }
    if let Some(interests) = interests {
        profile.interests = interests;
    }
    if let Some(games) = favourite_games {
        profile.favourite_games = games;
    }
    if let Some(is_public) = is_public {
        profile.is_public = is_public;
    }
}

fn to_response(row: ProfileRow) -> ProfileResponse {
    ProfileResponse {
        id: row.id,
        user_id: row.account_id,
        display_name: row.display_name,
        bio: row.bio,
        height: row.height,
        weight: row.weight,
        zodiac_sign: row.zodiac_sign,
        date_of_birth: row.date_of_birth,
        horoscope: row.horoscope,
        profile_image_url: row.profile_image_url,
        gallery_image_urls: row.gallery_image_urls,
        gender: row.gender,
        location: row.location,
        occupation: row.occupation,
        education: row.education,
        interests: row.interests,
        favourite_games: row.favourite_games,
        is_public: row.is_public,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
