use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{OptionalExt, enum_col, uuid_col};
use crate::Database;
use crate::models::{AccountRow, NewAccount};

const ACCOUNT_COLUMNS: &str =
    "id, email, username, password, status, email_verified, last_login, created_at, updated_at";

impl Database {
    /// Inserts an ACTIVE account. The email is expected to be normalised
    /// already; UNIQUE violations surface as errors (see `is_unique_violation`).
    pub fn create_account(&self, account: &NewAccount<'_>) -> Result<AccountRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO accounts (id, email, username, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![
                    account.id.to_string(),
                    account.email,
                    account.username,
                    account.password_hash,
                    account.now,
                ],
            )?;
            query_account(conn, "id", &account.id.to_string())?
                .ok_or_else(|| anyhow::anyhow!("account {} vanished after insert", account.id))
        })
    }

    pub fn get_account_by_id(&self, id: Uuid) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id", &id.to_string()))
    }

    pub fn get_account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "email", email))
    }

    pub fn get_account_by_username(&self, username: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username", username))
    }

    pub fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET last_login = ?2, updated_at = ?2 WHERE id = ?1",
                rusqlite::params![id.to_string(), at],
            )?;
            Ok(())
        })
    }
}

fn query_account(conn: &Connection, column: &str, value: &str) -> Result<Option<AccountRow>> {
    // `column` is always one of our own literals, never user input.
    let sql = format!("SELECT {} FROM accounts WHERE {} = ?1", ACCOUNT_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_account).optional()
}

fn map_account(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: uuid_col(row, 0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password: row.get(3)?,
        status: enum_col(row, 4)?,
        email_verified: row.get(5)?,
        last_login: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use kindred_types::models::AccountStatus;

    use super::*;
    use crate::is_unique_violation;

    fn new_account<'a>(email: &'a str, username: &'a str) -> NewAccount<'a> {
        NewAccount {
            id: Uuid::new_v4(),
            email,
            username,
            password_hash: "$argon2id$stub",
            now: Utc::now(),
        }
    }

    #[test]
    fn creates_and_fetches_accounts() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_account(&new_account("a@example.com", "alice")).unwrap();

        assert_eq!(created.status, AccountStatus::Active);
        assert!(created.last_login.is_none());

        let by_email = db.get_account_by_email("a@example.com").unwrap().unwrap();
        let by_name = db.get_account_by_username("alice").unwrap().unwrap();
        let by_id = db.get_account_by_id(created.id).unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_id.email, "a@example.com");
        assert!(db.get_account_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&new_account("a@example.com", "alice")).unwrap();

        let err = db.create_account(&new_account("a@example.com", "alice2")).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn touch_last_login_records_timestamp() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_account(&new_account("a@example.com", "alice")).unwrap();
        let at = Utc::now();

        db.touch_last_login(created.id, at).unwrap();

        let row = db.get_account_by_id(created.id).unwrap().unwrap();
        assert_eq!(row.last_login, Some(at));
    }
}
