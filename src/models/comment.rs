use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub author_id: Option<i64>, // None for comments seeded outside a session
    pub name: Option<String>,   // display name shown next to the body
    pub body: String,
    pub approved: bool,         // moderation gate, false until a staff user approves
    pub created_on: DateTime<Utc>,
}

impl Comment {
    /// Whether `user_id`/`username` wrote this comment. Comments without a
    /// recorded author fall back to comparing the display name.
    pub fn is_written_by(&self, user_id: i64, username: &str) -> bool {
        match self.author_id {
            Some(author_id) => author_id == user_id,
            None => self.name.as_deref() == Some(username),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub review_id: i64,
    pub author_id: Option<i64>,
    pub name: Option<String>,
    pub body: String,
    pub approved: bool,
    pub created_on: DateTime<Utc>,
}
