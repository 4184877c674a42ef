use sqlx::{FromRow, Pool, Sqlite};

use crate::auth;
use crate::db::models::{NewUser, ReceivedMessage, SentMessage, User, UserProfile, UserSummary};
use crate::error::AppError;

/// One side of a mailbox query: the message columns plus the counterpart
/// user (recipient for the outbox, sender for the inbox).
#[derive(Debug, FromRow)]
struct MailboxRow {
    id: String,
    body: String,
    sent_at: i64,
    read_at: Option<i64>,
    username: String,
    first_name: String,
    last_name: String,
    phone: String,
}

impl MailboxRow {
    fn counterpart(&self) -> UserSummary {
        UserSummary {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
        }
    }

    fn into_sent(self) -> SentMessage {
        SentMessage {
            to_user: self.counterpart(),
            id: self.id,
            body: self.body,
            sent_at: self.sent_at,
            read_at: self.read_at,
        }
    }

    fn into_received(self) -> ReceivedMessage {
        ReceivedMessage {
            from_user: self.counterpart(),
            id: self.id,
            body: self.body,
            sent_at: self.sent_at,
            read_at: self.read_at,
        }
    }
}

pub struct UserRepository;

impl UserRepository {
    /// Register a new user. The plaintext password is hashed before it
    /// touches the database; both timestamps start at the current time.
    /// A username conflict is surfaced as `DuplicateUsername` - the
    /// insert itself is the uniqueness check, there is no read-first.
    pub async fn register(
        pool: &Pool<Sqlite>,
        new_user: NewUser,
        work_factor: u32,
    ) -> Result<User, AppError> {
        let hashed = auth::hash_password(&new_user.password, work_factor)?;
        let now = chrono::Utc::now().timestamp();

        let user = sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (username, password, first_name, last_name, phone, join_at, last_login_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&new_user.username)
        .bind(&hashed)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::DuplicateUsername(new_user.username.clone())
            }
            _ => AppError::from(e),
        })?;

        Ok(user)
    }

    /// Check a username/password pair. An unknown username is an error;
    /// a wrong password is a normal `false`.
    pub async fn authenticate(
        pool: &Pool<Sqlite>,
        username: &str,
        password: &str,
    ) -> Result<bool, AppError> {
        let stored: Option<(String,)> =
            sqlx::query_as("SELECT password FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(pool)
                .await?;

        let (hash,) =
            stored.ok_or_else(|| AppError::NotFound(format!("No such user: {}", username)))?;

        Ok(auth::verify_password(password, &hash))
    }

    /// Stamp a successful login.
    pub async fn update_login_timestamp(
        pool: &Pool<Sqlite>,
        username: &str,
    ) -> Result<(), AppError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("UPDATE users SET last_login_at = ? WHERE username = ?")
            .bind(now)
            .bind(username)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("No such user: {}", username)));
        }

        Ok(())
    }

    /// Basic info on all users. No password or timestamp columns leave
    /// the database here.
    pub async fn all(pool: &Pool<Sqlite>) -> Result<Vec<UserSummary>, AppError> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT username, first_name, last_name, phone FROM users ORDER BY username",
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn get(pool: &Pool<Sqlite>, username: &str) -> Result<UserProfile, AppError> {
        let user = sqlx::query_as::<_, UserProfile>(
            r#"
SELECT username, first_name, last_name, phone, join_at, last_login_at
FROM users
WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No such user: {}", username)))?;

        Ok(user)
    }

    /// Messages this user sent, each with the recipient joined in.
    /// Unknown usernames are `NotFound`; a user who sent nothing gets an
    /// empty list.
    pub async fn messages_from(
        pool: &Pool<Sqlite>,
        username: &str,
    ) -> Result<Vec<SentMessage>, AppError> {
        Self::ensure_exists(pool, username).await?;

        let rows = sqlx::query_as::<_, MailboxRow>(
            r#"
SELECT m.id, m.body, m.sent_at, m.read_at,
       u.username, u.first_name, u.last_name, u.phone
FROM messages m
JOIN users u ON m.to_username = u.username
WHERE m.from_username = ?
ORDER BY m.sent_at
            "#,
        )
        .bind(username)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(MailboxRow::into_sent).collect())
    }

    /// Messages this user received, each with the sender joined in.
    pub async fn messages_to(
        pool: &Pool<Sqlite>,
        username: &str,
    ) -> Result<Vec<ReceivedMessage>, AppError> {
        Self::ensure_exists(pool, username).await?;

        let rows = sqlx::query_as::<_, MailboxRow>(
            r#"
SELECT m.id, m.body, m.sent_at, m.read_at,
       u.username, u.first_name, u.last_name, u.phone
FROM messages m
JOIN users u ON m.from_username = u.username
WHERE m.to_username = ?
ORDER BY m.sent_at
            "#,
        )
        .bind(username)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(MailboxRow::into_received).collect())
    }

    async fn ensure_exists(pool: &Pool<Sqlite>, username: &str) -> Result<(), AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;

        row.map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("No such user: {}", username)))
    }
}
