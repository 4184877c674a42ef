use sqlx::{FromRow, Pool, Sqlite};
use uuid::Uuid;

use crate::db::models::{Message, MessageDetail, ReadReceipt, UserSummary};
use crate::error::AppError;

#[derive(Debug, FromRow)]
struct MessageDetailRow {
    id: String,
    body: String,
    sent_at: i64,
    read_at: Option<i64>,
    from_username: String,
    from_first_name: String,
    from_last_name: String,
    from_phone: String,
    to_username: String,
    to_first_name: String,
    to_last_name: String,
    to_phone: String,
}

pub struct MessageRepository;

impl MessageRepository {
    /// Store a new message, unread, stamped with the current time. An
    /// unknown recipient trips the foreign key and comes back as a
    /// validation error rather than a bare storage failure.
    pub async fn create(
        pool: &Pool<Sqlite>,
        from_username: &str,
        to_username: &str,
        body: &str,
    ) -> Result<Message, AppError> {
        let id = Uuid::new_v4().to_string();
        let sent_at = chrono::Utc::now().timestamp();

        let message = sqlx::query_as::<_, Message>(
            r#"
INSERT INTO messages (id, from_username, to_username, body, sent_at, read_at)
VALUES (?, ?, ?, ?, ?, NULL)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(from_username)
        .bind(to_username)
        .bind(body)
        .bind(sent_at)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::Validation(format!("No such recipient: {}", to_username))
            }
            _ => AppError::from(e),
        })?;

        Ok(message)
    }

    /// Fetch a message with both parties joined in.
    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<MessageDetail, AppError> {
        let row = sqlx::query_as::<_, MessageDetailRow>(
            r#"
SELECT m.id, m.body, m.sent_at, m.read_at,
       f.username AS from_username, f.first_name AS from_first_name,
       f.last_name AS from_last_name, f.phone AS from_phone,
       t.username AS to_username, t.first_name AS to_first_name,
       t.last_name AS to_last_name, t.phone AS to_phone
FROM messages m
JOIN users f ON m.from_username = f.username
JOIN users t ON m.to_username = t.username
WHERE m.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No such message: {}", id)))?;

        Ok(MessageDetail {
            id: row.id,
            body: row.body,
            sent_at: row.sent_at,
            read_at: row.read_at,
            from_user: UserSummary {
                username: row.from_username,
                first_name: row.from_first_name,
                last_name: row.from_last_name,
                phone: row.from_phone,
            },
            to_user: UserSummary {
                username: row.to_username,
                first_name: row.to_first_name,
                last_name: row.to_last_name,
                phone: row.to_phone,
            },
        })
    }

    /// Record the read timestamp. The first call wins; repeats succeed
    /// and return the original receipt. This does not check who is
    /// asking - recipient-only enforcement lives in the route layer.
    pub async fn mark_read(pool: &Pool<Sqlite>, id: &str) -> Result<ReadReceipt, AppError> {
        let now = chrono::Utc::now().timestamp();

        let receipt = sqlx::query_as::<_, ReadReceipt>(
            r#"
UPDATE messages
SET read_at = COALESCE(read_at, ?)
WHERE id = ?
RETURNING id, read_at
            "#,
        )
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No such message: {}", id)))?;

        Ok(receipt)
    }
}
