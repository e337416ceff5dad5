use rusqlite::Connection;

use crate::models::{MessageRow, ReplyRow, UserRow};
use crate::{Database, StoreError, map_sqlite};

impl Database {
    // -- Users --

    /// Insert a new identity. Email uniqueness is enforced here, by the
    /// UNIQUE constraint: concurrent signups with the same email race to
    /// this insert and exactly one wins.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        now: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                (id, email, password_hash, now),
            )
            .map_err(map_sqlite)?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
        media_urls: &str,
        now: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, user_id, content, media_urls, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                (id, user_id, content, media_urls, now),
            )
            .map_err(map_sqlite)?;
            Ok(())
        })
    }

    /// Newest messages first.
    pub fn list_messages(&self, limit: u32) -> Result<Vec<MessageRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, content, media_urls, created_at, updated_at
                 FROM messages
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        content: row.get(2)?,
                        media_urls: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, content, media_urls, created_at, updated_at
                 FROM messages WHERE id = ?1",
            )?;

            stmt.query_row([id], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    content: row.get(2)?,
                    media_urls: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })
            .optional()
        })
    }

    // -- Replies --

    /// Insert a reply. Parent existence is enforced by the FOREIGN KEY
    /// constraint, not checked up front: a missing parent surfaces as
    /// `StoreError::ForeignKey`.
    pub fn insert_reply(
        &self,
        id: &str,
        message_id: &str,
        user_id: &str,
        content: &str,
        media_urls: &str,
        now: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO replies (id, message_id, user_id, content, media_urls, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                (id, message_id, user_id, content, media_urls, now),
            )
            .map_err(map_sqlite)?;
            Ok(())
        })
    }

    /// Replies in thread order: oldest first.
    pub fn list_replies(&self, message_id: &str) -> Result<Vec<ReplyRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, message_id, user_id, content, media_urls, created_at, updated_at
                 FROM replies
                 WHERE message_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([message_id], |row| {
                    Ok(ReplyRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        user_id: row.get(2)?,
                        content: row.get(3)?,
                        media_urls: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, email, password_hash, created_at, updated_at
         FROM users WHERE email = ?1",
    )?;

    stmt.query_row([email], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    })
    .optional()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
