use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::db::models::User;
use crate::error::AppResult;
use crate::state::DbPool;

/// Insert a user with a fresh id, or return the existing one with that name.
pub fn create_user(pool: &DbPool, username: &str) -> AppResult<User> {
    let conn = pool.get()?;

    conn.execute(
        "INSERT OR IGNORE INTO users (id, username) VALUES (?1, ?2)",
        params![uuid::Uuid::now_v7().to_string(), username],
    )?;

    let user = conn.query_row(
        "SELECT id, username FROM users WHERE username = ?1",
        params![username],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        },
    )?;

    Ok(user)
}

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: &str, hours: u64) -> AppResult<String> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Look up the user behind an unexpired session token.
pub fn resolve_session(pool: &DbPool, token: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;

    let user = conn
        .query_row(
            "SELECT u.id, u.username FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            },
        )
        .optional()?;

    Ok(user)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
