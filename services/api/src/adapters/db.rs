//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `EntityStore` and `AuthStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.
//!
//! Every note query carries both `id` and `user_id` in its `WHERE` clause, so a
//! foreign note is indistinguishable from a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notecode_core::domain::{NewNote, Note, NoteUpdate, UpsertUser, User, UserCredentials};
use notecode_core::ports::{AuthStore, EntityStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Builds an `ILIKE` pattern that matches `query` literally anywhere in the value.
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, profile_image_url, created_at, updated_at";
const NOTE_COLUMNS: &str = "id, user_id, title, content, language, created_at, updated_at";

#[derive(FromRow)]
struct UserRecord {
    id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            profile_image_url: self.profile_image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    user_id: String,
    title: String,
    content: String,
    language: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            language: self.language,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: String,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

//=========================================================================================
// `EntityStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl EntityStore for DbAdapter {
    async fn get_user(&self, id: &str) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn upsert_user(&self, user: UpsertUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email, first_name, last_name, profile_image_url) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
                 email = COALESCE(EXCLUDED.email, users.email), \
                 first_name = COALESCE(EXCLUDED.first_name, users.first_name), \
                 last_name = COALESCE(EXCLUDED.last_name, users.last_name), \
                 profile_image_url = COALESCE(EXCLUDED.profile_image_url, users.profile_image_url), \
                 updated_at = now() \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.profile_image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        debug!("Upserted user {}", record.id);
        Ok(record.to_domain())
    }

    async fn get_notes_by_user_id(&self, user_id: &str) -> PortResult<Vec<Note>> {
        let records = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let notes = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(notes)
    }

    async fn get_note_by_id(&self, id: Uuid, user_id: &str) -> PortResult<Option<Note>> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(NoteRecord::to_domain))
    }

    async fn create_note(&self, note: NewNote) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "INSERT INTO notes (id, user_id, title, content, language) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&note.user_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.language)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        debug!("Created note {} for user {}", record.id, record.user_id);
        Ok(record.to_domain())
    }

    async fn update_note(
        &self,
        id: Uuid,
        user_id: &str,
        updates: NoteUpdate,
    ) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "UPDATE notes SET \
                 title = COALESCE($3, title), \
                 content = COALESCE($4, content), \
                 language = COALESCE($5, language), \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&updates.title)
        .bind(&updates.content)
        .bind(&updates.language)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Note {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn delete_note(&self, id: Uuid, user_id: &str) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        debug!("Deleted {} row(s) for note {}", result.rows_affected(), id);
        Ok(())
    }

    async fn search_notes(&self, user_id: &str, query: &str) -> PortResult<Vec<Note>> {
        let records = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE user_id = $1 AND title ILIKE $2 ESCAPE '\\' \
             ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .bind(contains_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let notes = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(notes)
    }
}

//=========================================================================================
// `AuthStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthStore for DbAdapter {
    async fn register_user(
        &self,
        user: UpsertUser,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email, first_name, last_name, profile_image_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.profile_image_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO user_credentials (user_id, email, hashed_password) VALUES ($1, $2, $3)",
        )
        .bind(&record.id)
        .bind(email)
        .bind(hashed_password)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Email {} is already registered", email))
            }
            _ => unexpected(e),
        })?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM user_credentials WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("No credentials for {}", email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let pruned = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if pruned.rows_affected() > 0 {
            debug!("Pruned {} expired auth session(s)", pruned.rows_affected());
        }

        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        let user_id = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
