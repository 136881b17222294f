use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use kindred_types::models::ConversationStatus;

use super::{OptionalExt, enum_col, opt_uuid_col, pair_key, uuid_col};
use crate::Database;
use crate::models::{ConversationRow, ParticipantRow};

const CONVERSATION_COLUMNS: &str = "id, last_message, last_message_id, last_message_at, status,
    message_count, is_blocked, created_at, updated_at";

impl Database {
    /// Returns the conversation between `a` and `b`, creating it if needed.
    /// The UNIQUE pair key makes this safe against two first messages racing;
    /// the flag is `true` only for the caller that actually created it.
    pub fn find_or_create_conversation(
        &self,
        a: Uuid,
        b: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(ConversationRow, bool)> {
        let key = pair_key(a, b);
        let candidate = Uuid::new_v4().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO conversations (id, pair_key, last_message_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3, ?3)
                 ON CONFLICT(pair_key) DO NOTHING",
                rusqlite::params![candidate, key, now],
            )?;
            if inserted == 1 {
                for participant in [a, b] {
                    tx.execute(
                        "INSERT INTO conversation_participants (conversation_id, account_id, joined_at)
                         VALUES (?1, ?2, ?3)",
                        rusqlite::params![candidate, participant.to_string(), now],
                    )?;
                }
            }
            let conversation = query_conversation(&tx, "pair_key", &key)?
                .ok_or_else(|| anyhow::anyhow!("conversation for {} missing after upsert", key))?;
            tx.commit()?;
            Ok((conversation, inserted == 1))
        })
    }

    pub fn find_conversation_between(&self, a: Uuid, b: Uuid) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| query_conversation(conn, "pair_key", &pair_key(a, b)))
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| query_conversation(conn, "id", &id.to_string()))
    }

    /// Conversations `account_id` takes part in, newest activity first.
    pub fn list_conversations(
        &self,
        account_id: Uuid,
        status: ConversationStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM conversations
                 WHERE status = ?2
                   AND id IN (SELECT conversation_id FROM conversation_participants WHERE account_id = ?1)
                 ORDER BY last_message_at DESC, rowid DESC
                 LIMIT ?3 OFFSET ?4",
                CONVERSATION_COLUMNS
            ))?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![account_id.to_string(), status.as_str(), limit, offset],
                    map_conversation,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let ids: Vec<Uuid> = rows.iter().map(|c| c.id).collect();
            let mut participants = load_participants(conn, &ids)?;
            for row in &mut rows {
                row.participants = participants.remove(&row.id).unwrap_or_default();
            }
            Ok(rows)
        })
    }

    pub fn count_conversations(&self, account_id: Uuid, status: ConversationStatus) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM conversations
                 WHERE status = ?2
                   AND id IN (SELECT conversation_id FROM conversation_participants WHERE account_id = ?1)",
                rusqlite::params![account_id.to_string(), status.as_str()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Sets `is_blocked`. Blocking also re-activates an archived conversation.
    pub fn set_conversation_blocked(
        &self,
        conversation_id: Uuid,
        blocked: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let sql = if blocked {
                "UPDATE conversations SET is_blocked = 1, status = 'ACTIVE', updated_at = ?2 WHERE id = ?1"
            } else {
                "UPDATE conversations SET is_blocked = 0, updated_at = ?2 WHERE id = ?1"
            };
            conn.execute(sql, rusqlite::params![conversation_id.to_string(), now])?;
            Ok(())
        })
    }
}

fn query_conversation(conn: &Connection, column: &str, value: &str) -> Result<Option<ConversationRow>> {
    let sql = format!("SELECT {} FROM conversations WHERE {} = ?1", CONVERSATION_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    let Some(mut row) = stmt.query_row([value], map_conversation).optional()? else {
        return Ok(None);
    };
    row.participants = load_participants(conn, &[row.id])?
        .remove(&row.id)
        .unwrap_or_default();
    Ok(Some(row))
}

fn map_conversation(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    let count: i64 = row.get(5)?;
    Ok(ConversationRow {
        id: uuid_col(row, 0)?,
        participants: Vec::new(),
        last_message: row.get(1)?,
        last_message_id: opt_uuid_col(row, 2)?,
        last_message_at: row.get(3)?,
        status: enum_col(row, 4)?,
        message_count: count.max(0) as u64,
        is_blocked: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Batch-fetch participants (with username/email) for a set of conversations.
fn load_participants(
    conn: &Connection,
    conversation_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<ParticipantRow>>> {
    let mut by_conversation: HashMap<Uuid, Vec<ParticipantRow>> = HashMap::new();
    if conversation_ids.is_empty() {
        return Ok(by_conversation);
    }

    let placeholders: Vec<String> = (1..=conversation_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT p.conversation_id, p.account_id, a.username, a.email, p.joined_at, p.is_muted
         FROM conversation_participants p
         LEFT JOIN accounts a ON a.id = p.account_id
         WHERE p.conversation_id IN ({})
         ORDER BY p.rowid",
        placeholders.join(", ")
    );

    let ids: Vec<String> = conversation_ids.iter().map(Uuid::to_string).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
        Ok((
            uuid_col(row, 0)?,
            ParticipantRow {
                account_id: uuid_col(row, 1)?,
                username: row.get(2)?,
                email: row.get(3)?,
                joined_at: row.get(4)?,
                is_muted: row.get(5)?,
            },
        ))
    })?;

    for row in rows {
        let (conversation_id, participant) = row?;
        by_conversation.entry(conversation_id).or_default().push(participant);
    }
    Ok(by_conversation)
}

/// Points the conversation's denormalised last-message fields at a newly
/// stored message and bumps its count.
pub(crate) fn touch_last_message(
    conn: &Connection,
    conversation_id: Uuid,
    message_id: Uuid,
    content: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE conversations
         SET last_message = ?2, last_message_id = ?3, last_message_at = ?4,
             message_count = message_count + 1, updated_at = ?4
         WHERE id = ?1",
        rusqlite::params![conversation_id.to_string(), content, message_id.to_string(), at],
    )?;
    if changed != 1 {
        anyhow::bail!("conversation {} not found", conversation_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use kindred_types::models::MessageType;

    use super::*;
    use crate::models::{NewAccount, NewMessage};

    fn account(db: &Database, name: &str) -> Uuid {
        let email = format!("{}@example.com", name);
        db.create_account(&NewAccount {
            id: Uuid::new_v4(),
            email: &email,
            username: name,
            password_hash: "$argon2id$stub",
            now: Utc::now(),
        })
        .unwrap()
        .id
    }

    #[test]
    fn one_conversation_per_unordered_pair() {
        let db = Database::open_in_memory().unwrap();
        let alice = account(&db, "alice");
        let bob = account(&db, "bob");

        let (first, created) = db.find_or_create_conversation(alice, bob, Utc::now()).unwrap();
        let (second, created_again) = db.find_or_create_conversation(bob, alice, Utc::now()).unwrap();

        assert!(created);
        assert!(!created_again);
        assert_eq!(first.id, second.id);
        assert_eq!(first.participants.len(), 2);
        assert_eq!(first.participants[0].account_id, alice);
        assert_eq!(first.participants[1].username.as_deref(), Some("bob"));
        assert_eq!(first.status, ConversationStatus::Active);
        assert_eq!(first.message_count, 0);

        let between = db.find_conversation_between(bob, alice).unwrap().unwrap();
        assert_eq!(between.id, first.id);
    }

    #[test]
    fn lists_newest_activity_first() {
        let db = Database::open_in_memory().unwrap();
        let alice = account(&db, "alice");
        let bob = account(&db, "bob");
        let carol = account(&db, "carol");

        let (with_bob, _) = db.find_or_create_conversation(alice, bob, Utc::now()).unwrap();
        let (with_carol, _) = db.find_or_create_conversation(alice, carol, Utc::now()).unwrap();
        db.insert_message(&NewMessage {
            id: Uuid::new_v4(),
            conversation_id: with_bob.id,
            sender_id: bob,
            receiver_id: alice,
            content: "latest",
            message_type: MessageType::Text,
            attachments: &[],
            reply_to_id: None,
            now: Utc::now(),
        })
        .unwrap();

        let listed = db.list_conversations(alice, ConversationStatus::Active, 10, 0).unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![with_bob.id, with_carol.id]);
        assert_eq!(listed[0].last_message.as_deref(), Some("latest"));
        assert_eq!(listed[0].message_count, 1);
        assert_eq!(listed[1].participants.len(), 2);

        assert_eq!(db.count_conversations(alice, ConversationStatus::Active).unwrap(), 2);
        assert_eq!(db.count_conversations(bob, ConversationStatus::Active).unwrap(), 1);
        assert_eq!(db.list_conversations(alice, ConversationStatus::Active, 1, 1).unwrap().len(), 1);
    }

    #[test]
    fn block_flag_toggles() {
        let db = Database::open_in_memory().unwrap();
        let alice = account(&db, "alice");
        let bob = account(&db, "bob");
        let (conv, _) = db.find_or_create_conversation(alice, bob, Utc::now()).unwrap();

        db.set_conversation_blocked(conv.id, true, Utc::now()).unwrap();
        assert!(db.get_conversation(conv.id).unwrap().unwrap().is_blocked);

        db.set_conversation_blocked(conv.id, false, Utc::now()).unwrap();
        assert!(!db.get_conversation(conv.id).unwrap().unwrap().is_blocked);
    }
}
