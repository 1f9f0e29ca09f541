use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash, never leaves the server
    pub is_staff: bool,        // staff users moderate comments
    pub date_joined: DateTime<Utc>,
}
