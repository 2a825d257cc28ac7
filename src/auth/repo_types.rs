use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

pub type UserId = i64;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,                 // generated on insert
    pub username: String,           // unique, case-sensitive
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime, // creation timestamp
}

/// Outcome of inserting a user.
#[derive(Debug)]
pub enum CreateUser {
    Created(User),
    UsernameTaken,
}
