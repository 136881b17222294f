use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::conversations::touch_last_message;
use super::{OptionalExt, enum_col, json_col, opt_uuid_col, to_json, uuid_col};
use crate::Database;
use crate::models::{MessageRow, NewMessage, ReactionRow};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, receiver_id, content, message_type,
    attachments, status, read_at, is_edited, edited_at, reply_to_id, created_at, updated_at";

impl Database {
    // -- Messages --

    /// Stores a message and, in the same transaction, makes it the
    /// conversation's last message and bumps the count.
    pub fn insert_message(&self, message: &NewMessage<'_>) -> Result<MessageRow> {
        let attachments = to_json(&message.attachments)?;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, content,
                     message_type, attachments, reply_to_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.sender_id.to_string(),
                    message.receiver_id.to_string(),
                    message.content,
                    message.message_type.as_str(),
                    attachments,
                    message.reply_to_id.map(|id| id.to_string()),
                    message.now,
                ],
            )?;
            touch_last_message(
                &tx,
                message.conversation_id,
                message.id,
                message.content,
                message.now,
            )?;
            let row = query_message(&tx, message.id)?
                .ok_or_else(|| anyhow::anyhow!("message {} vanished after insert", message.id))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_message(&self, id: Uuid) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// One page of a conversation, newest first, reactions attached.
    pub fn list_messages(&self, conversation_id: Uuid, limit: u32, offset: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
                MESSAGE_COLUMNS
            ))?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![conversation_id.to_string(), limit, offset],
                    map_message,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let ids: Vec<Uuid> = rows.iter().map(|m| m.id).collect();
            let mut reactions = query_reactions_for_messages(conn, &ids)?;
            for row in &mut rows {
                row.reactions = reactions.remove(&row.id).unwrap_or_default();
            }
            Ok(rows)
        })
    }

    pub fn count_messages(&self, conversation_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                [conversation_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Marks every unread message addressed to `receiver_id` in the
    /// conversation as READ. Returns how many changed.
    pub fn mark_conversation_read(
        &self,
        conversation_id: Uuid,
        receiver_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = 'READ', read_at = ?3, updated_at = ?3
                 WHERE conversation_id = ?1 AND receiver_id = ?2
                   AND status IN ('SENT', 'DELIVERED')",
                rusqlite::params![conversation_id.to_string(), receiver_id.to_string(), at],
            )?;
            Ok(changed)
        })
    }

    pub fn update_message_content(&self, id: Uuid, content: &str, at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET content = ?2, is_edited = 1, edited_at = ?3, updated_at = ?3
                 WHERE id = ?1",
                rusqlite::params![id.to_string(), content, at],
            )?;
            Ok(())
        })
    }

    /// Hard-deletes a message and keeps its conversation's denormalised
    /// fields consistent. Returns `false` if the message did not exist.
    pub fn delete_message(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(message) = query_message(&tx, id)? else {
                return Ok(false);
            };
            let conversation_id = message.conversation_id.to_string();

            tx.execute("DELETE FROM messages WHERE id = ?1", [id.to_string()])?;
            tx.execute(
                "UPDATE conversations
                 SET message_count = MAX(message_count - 1, 0), updated_at = ?2
                 WHERE id = ?1",
                rusqlite::params![conversation_id, now],
            )?;

            // Roll lastMessage back to the newest survivor if we removed it.
            let last_id: Option<String> = tx.query_row(
                "SELECT last_message_id FROM conversations WHERE id = ?1",
                [&conversation_id],
                |row| row.get(0),
            )?;
            if last_id.as_deref() == Some(id.to_string().as_str()) {
                let newest: Option<(String, String, DateTime<Utc>)> = tx
                    .query_row(
                        "SELECT id, content, created_at FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY created_at DESC, rowid DESC LIMIT 1",
                        [&conversation_id],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;
                match newest {
                    Some((newest_id, content, at)) => tx.execute(
                        "UPDATE conversations SET last_message = ?2, last_message_id = ?3, last_message_at = ?4
                         WHERE id = ?1",
                        rusqlite::params![conversation_id, content, newest_id, at],
                    )?,
                    None => tx.execute(
                        "UPDATE conversations SET last_message = NULL, last_message_id = NULL WHERE id = ?1",
                        [&conversation_id],
                    )?,
                };
            }

            tx.commit()?;
            Ok(true)
        })
    }

    // -- Reactions --

    /// Inserts a reaction. Returns `false` if this (account, emoji) pair
    /// already reacted to the message.
    pub fn add_reaction(
        &self,
        message_id: Uuid,
        account_id: Uuid,
        emoji: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO message_reactions (message_id, account_id, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![message_id.to_string(), account_id.to_string(), emoji, at],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn remove_reaction(&self, message_id: Uuid, account_id: Uuid, emoji: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM message_reactions WHERE message_id = ?1 AND account_id = ?2 AND emoji = ?3",
                rusqlite::params![message_id.to_string(), account_id.to_string(), emoji],
            )?;
            Ok(removed)
        })
    }

    pub fn get_reactions(&self, message_id: Uuid) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            Ok(query_reactions_for_messages(conn, &[message_id])?
                .remove(&message_id)
                .unwrap_or_default())
        })
    }
}

fn query_message(conn: &Connection, id: Uuid) -> Result<Option<MessageRow>> {
    let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let Some(mut row) = stmt.query_row([id.to_string()], map_message).optional()? else {
        return Ok(None);
    };
    row.reactions = query_reactions_for_messages(conn, &[id])?
        .remove(&id)
        .unwrap_or_default();
    Ok(Some(row))
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: uuid_col(row, 0)?,
        conversation_id: uuid_col(row, 1)?,
        sender_id: uuid_col(row, 2)?,
        receiver_id: uuid_col(row, 3)?,
        content: row.get(4)?,
        message_type: enum_col(row, 5)?,
        attachments: json_col(row, 6)?,
        status: enum_col(row, 7)?,
        read_at: row.get(8)?,
        is_edited: row.get(9)?,
        edited_at: row.get(10)?,
        reply_to_id: opt_uuid_col(row, 11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        reactions: Vec::new(),
    })
}

/// Batch-fetch reactions for a set of message IDs, in insertion order.
fn query_reactions_for_messages(
    conn: &Connection,
    message_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<ReactionRow>>> {
    let mut by_message: HashMap<Uuid, Vec<ReactionRow>> = HashMap::new();
    if message_ids.is_empty() {
        return Ok(by_message);
    }

    let placeholders: Vec<String> = (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT message_id, account_id, emoji, created_at FROM message_reactions
         WHERE message_id IN ({})
         ORDER BY rowid",
        placeholders.join(", ")
    );

    let ids: Vec<String> = message_ids.iter().map(Uuid::to_string).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
        Ok(ReactionRow {
            message_id: uuid_col(row, 0)?,
            account_id: uuid_col(row, 1)?,
            emoji: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;

    for row in rows {
        let reaction = row?;
        by_message.entry(reaction.message_id).or_default().push(reaction);
    }
    Ok(by_message)
}
