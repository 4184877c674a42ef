use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: i64,
    pub last_login_at: i64,
}

/// Registration input. The password is still plaintext here; the
/// repository hashes it before the row is written.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Public subset of a user, safe for any authenticated caller.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Full profile minus the password column.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: i64,
    pub last_login_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: String,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: i64,
    pub read_at: Option<i64>,
}

/// A message with both parties joined in as identity snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct MessageDetail {
    pub id: String,
    pub body: String,
    pub sent_at: i64,
    pub read_at: Option<i64>,
    pub from_user: UserSummary,
    pub to_user: UserSummary,
}

/// Outbox view: what a user sent, with the recipient joined in.
#[derive(Debug, Clone, Serialize)]
pub struct SentMessage {
    pub id: String,
    pub to_user: UserSummary,
    pub body: String,
    pub sent_at: i64,
    pub read_at: Option<i64>,
}

/// Inbox view: what a user received, with the sender joined in.
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedMessage {
    pub id: String,
    pub body: String,
    pub sent_at: i64,
    pub read_at: Option<i64>,
    pub from_user: UserSummary,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReadReceipt {
    pub id: String,
    pub read_at: i64,
}
