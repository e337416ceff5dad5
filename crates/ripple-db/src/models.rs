/// Database row types — these map directly to SQLite rows.
/// Distinct from the ripple-types API models so the DB layer stays
/// independent of the HTTP surface.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub user_id: String,
    pub content: String,
    /// JSON-encoded array of opaque media URLs.
    pub media_urls: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ReplyRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub content: String,
    pub media_urls: String,
    pub created_at: String,
    pub updated_at: String,
}
