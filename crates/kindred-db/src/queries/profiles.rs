use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{OptionalExt, json_col, opt_enum_col, to_json, uuid_col};
use crate::Database;
use crate::models::ProfileRow;

const PROFILE_COLUMNS: &str = "id, account_id, display_name, bio, height, weight, zodiac_sign,
    date_of_birth, horoscope, profile_image_url, gallery_image_urls, gender, location,
    occupation, education, interests, favourite_games, is_public, created_at, updated_at";

impl Database {
    pub fn insert_profile(&self, profile: &ProfileRow) -> Result<()> {
        let gallery = to_json(&profile.gallery_image_urls)?;
        let interests = to_json(&profile.interests)?;
        let games = to_json(&profile.favourite_games)?;

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO profiles ({}) VALUES
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
                    PROFILE_COLUMNS
                ),
                rusqlite::params![
                    profile.id.to_string(),
                    profile.account_id.to_string(),
                    profile.display_name,
                    profile.bio,
                    profile.height,
                    profile.weight,
                    profile.zodiac_sign.map(|s| s.as_str()),
                    profile.date_of_birth,
                    profile.horoscope,
                    profile.profile_image_url,
                    gallery,
                    profile.gender.map(|g| g.as_str()),
                    profile.location,
                    profile.occupation,
                    profile.education,
                    interests,
                    games,
                    profile.is_public,
                    profile.created_at,
                    profile.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Overwrites every mutable column of the profile identified by `profile.id`.
    pub fn update_profile(&self, profile: &ProfileRow) -> Result<()> {
        let gallery = to_json(&profile.gallery_image_urls)?;
        let interests = to_json(&profile.interests)?;
        let games = to_json(&profile.favourite_games)?;

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET
                    display_name = ?2, bio = ?3, height = ?4, weight = ?5, zodiac_sign = ?6,
                    date_of_birth = ?7, horoscope = ?8, profile_image_url = ?9,
                    gallery_image_urls = ?10, gender = ?11, location = ?12, occupation = ?13,
                    education = ?14, interests = ?15, favourite_games = ?16, is_public = ?17,
                    updated_at = ?18
                 WHERE id = ?1",
                rusqlite::params![
                    profile.id.to_string(),
                    profile.display_name,
                    profile.bio,
                    profile.height,
                    profile.weight,
                    profile.zodiac_sign.map(|s| s.as_str()),
                    profile.date_of_birth,
                    profile.horoscope,
                    profile.profile_image_url,
                    gallery,
                    profile.gender.map(|g| g.as_str()),
                    profile.location,
                    profile.occupation,
                    profile.education,
                    interests,
                    games,
                    profile.is_public,
                    profile.updated_at,
                ],
            )?;
            if changed == 0 {
                anyhow::bail!("profile {} does not exist", profile.id);
            }
            Ok(())
        })
    }

    pub fn get_profile_by_account(&self, account_id: Uuid) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "account_id", account_id))
    }

    pub fn get_profile_by_id(&self, id: Uuid) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "id", id))
    }
}

fn query_profile(conn: &Connection, column: &str, value: Uuid) -> Result<Option<ProfileRow>> {
    let sql = format!("SELECT {} FROM profiles WHERE {} = ?1", PROFILE_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value.to_string()], map_profile).optional()
}

fn map_profile(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: uuid_col(row, 0)?,
        account_id: uuid_col(row, 1)?,
        display_name: row.get(2)?,
        bio: row.get(3)?,
        height: row.get(4)?,
        weight: row.get(5)?,
        zodiac_sign: opt_enum_col(row, 6)?,
        date_of_birth: row.get(7)?,
        horoscope: row.get(8)?,
        profile_image_url: row.get(9)?,
        gallery_image_urls: json_col(row, 10)?,
        gender: opt_enum_col(row, 11)?,
        location: row.get(12)?,
        occupation: row.get(13)?,
        education: row.get(14)?,
        interests: json_col(row, 15)?,
        favourite_games: json_col(row, 16)?,
        is_public: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use kindred_types::models::{FavouriteGame, Gender, ZodiacSign};

    use super::*;
    use crate::{is_foreign_key_violation, is_unique_violation};
    use crate::models::NewAccount;

    fn seeded() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let account = db
            .create_account(&NewAccount {
                id: Uuid::new_v4(),
                email: "p@example.com",
                username: "pat",
                password_hash: "$argon2id$stub",
                now: Utc::now(),
            })
            .unwrap();
        (db, account.id)
    }

    #[test]
    fn stores_every_profile_column() {
        let (db, account_id) = seeded();
        let mut profile = ProfileRow::empty(Uuid::new_v4(), account_id, Utc::now());
        profile.display_name = Some("Pat".into());
        profile.height = Some(172.5);
        profile.zodiac_sign = Some(ZodiacSign::Taurus);
        profile.date_of_birth = NaiveDate::from_ymd_opt(1995, 5, 15);
        profile.gender = Some(Gender::Other);
        profile.interests = vec!["hiking".into(), "chess".into()];
        profile.favourite_games = vec![FavouriteGame {
            id: "g1".into(),
            name: "Hades".into(),
            image_url: "https://cdn.example.com/hades.jpg".into(),
        }];

        db.insert_profile(&profile).unwrap();

        let stored = db.get_profile_by_account(account_id).unwrap().unwrap();
        assert_eq!(stored, profile);
        assert_eq!(db.get_profile_by_id(profile.id).unwrap().unwrap(), profile);
    }

    #[test]
    fn one_profile_per_account() {
        let (db, account_id) = seeded();
        db.insert_profile(&ProfileRow::empty(Uuid::new_v4(), account_id, Utc::now()))
            .unwrap();

        let err = db
            .insert_profile(&ProfileRow::empty(Uuid::new_v4(), account_id, Utc::now()))
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn profile_for_an_unknown_account_is_a_foreign_key_failure() {
        let (db, _) = seeded();
        let err = db
            .insert_profile(&ProfileRow::empty(Uuid::new_v4(), Uuid::new_v4(), Utc::now()))
            .unwrap_err();
        assert!(is_foreign_key_violation(&err));
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn update_overwrites_columns() {
        let (db, account_id) = seeded();
        let mut profile = ProfileRow::empty(Uuid::new_v4(), account_id, Utc::now());
        db.insert_profile(&profile).unwrap();

        profile.bio = Some("updated".into());
        profile.is_public = true;
        db.update_profile(&profile).unwrap();

        let stored = db.get_profile_by_account(account_id).unwrap().unwrap();
        assert_eq!(stored.bio.as_deref(), Some("updated"));
        assert!(stored.is_public);
    }

    #[test]
    fn updating_a_missing_profile_fails() {
        let (db, account_id) = seeded();
        let profile = ProfileRow::empty(Uuid::new_v4(), account_id, Utc::now());
        assert!(db.update_profile(&profile).is_err());
    }
}
