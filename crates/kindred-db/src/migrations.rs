use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS accounts (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'ACTIVE'
                            CHECK (status IN ('ACTIVE', 'INACTIVE', 'SUSPENDED')),
            email_verified  INTEGER NOT NULL DEFAULT 0,
            last_login      TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id                  TEXT PRIMARY KEY,
            account_id          TEXT NOT NULL UNIQUE REFERENCES accounts(id),
            display_name        TEXT,
            bio                 TEXT,
            height              REAL,
            weight              REAL,
            zodiac_sign         TEXT CHECK (zodiac_sign IN (
                                    'ARIES', 'TAURUS', 'GEMINI', 'CANCER', 'LEO', 'VIRGO',
                                    'LIBRA', 'SCORPIO', 'SAGITTARIUS', 'CAPRICORN',
                                    'AQUARIUS', 'PISCES')),
            date_of_birth       TEXT,
            horoscope           TEXT,
            profile_image_url   TEXT,
            gallery_image_urls  TEXT NOT NULL DEFAULT '[]',
            gender              TEXT CHECK (gender IN ('MALE', 'FEMALE', 'OTHER')),
            location            TEXT,
            occupation          TEXT,
            education           TEXT,
            interests           TEXT NOT NULL DEFAULT '[]',
            favourite_games     TEXT NOT NULL DEFAULT '[]',
            is_public           INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        -- pair_key is the two participant ids sorted and joined, so an
        -- unordered pair can own at most one conversation.
        CREATE TABLE IF NOT EXISTS conversations (
            id              TEXT PRIMARY KEY,
            pair_key        TEXT NOT NULL UNIQUE,
            last_message    TEXT,
            last_message_id TEXT,
            last_message_at TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'ACTIVE'
                            CHECK (status IN ('ACTIVE', 'ARCHIVED', 'DELETED')),
            message_count   INTEGER NOT NULL DEFAULT 0 CHECK (message_count >= 0),
            is_blocked      INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_last_message_at
            ON conversations(last_message_at);

        CREATE TABLE IF NOT EXISTS conversation_participants (
            conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            account_id      TEXT NOT NULL REFERENCES accounts(id),
            joined_at       TEXT NOT NULL,
            is_muted        INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (conversation_id, account_id)
        );

        CREATE INDEX IF NOT EXISTS idx_participants_account
            ON conversation_participants(account_id);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations(id),
            sender_id       TEXT NOT NULL REFERENCES accounts(id),
            receiver_id     TEXT NOT NULL REFERENCES accounts(id),
            content         TEXT NOT NULL CHECK (length(content) >= 1),
            message_type    TEXT NOT NULL DEFAULT 'TEXT'
                            CHECK (message_type IN ('TEXT', 'IMAGE', 'FILE', 'AUDIO', 'VIDEO')),
            attachments     TEXT NOT NULL DEFAULT '[]',
            status          TEXT NOT NULL DEFAULT 'SENT'
                            CHECK (status IN ('SENT', 'DELIVERED', 'READ')),
            read_at         TEXT,
            is_edited       INTEGER NOT NULL DEFAULT 0,
            edited_at       TEXT,
            reply_to_id     TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_receiver_status
            ON messages(receiver_id, status);

        CREATE TABLE IF NOT EXISTS message_reactions (
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            account_id  TEXT NOT NULL REFERENCES accounts(id),
            emoji       TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            UNIQUE(message_id, account_id, emoji)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_message
            ON message_reactions(message_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
