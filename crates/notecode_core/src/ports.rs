//! crates/notecode_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage implementations.

use crate::domain::{NewNote, Note, NoteUpdate, UpsertUser, User, UserCredentials};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// CRUD and search over users and notes.
///
/// Every note-scoped operation requires the owning `user_id`; a note whose owner
/// differs is treated exactly like a note that does not exist.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // --- User Management ---
    async fn get_user(&self, id: &str) -> PortResult<Option<User>>;

    /// Inserts the user, or overwrites the supplied profile fields and refreshes
    /// `updated_at` when the id already exists.
    async fn upsert_user(&self, user: UpsertUser) -> PortResult<User>;

    // --- Note Management ---
    /// All notes of `user_id`, most recently updated first.
    async fn get_notes_by_user_id(&self, user_id: &str) -> PortResult<Vec<Note>>;

    async fn get_note_by_id(&self, id: Uuid, user_id: &str) -> PortResult<Option<Note>>;

    async fn create_note(&self, note: NewNote) -> PortResult<Note>;

    /// Fails with `PortError::NotFound` when no note matches both `id` and `user_id`.
    async fn update_note(&self, id: Uuid, user_id: &str, updates: NoteUpdate)
        -> PortResult<Note>;

    /// Deleting a missing or foreign note is a successful no-op.
    async fn delete_note(&self, id: Uuid, user_id: &str) -> PortResult<()>;

    /// Notes whose title contains `query` case-insensitively, most recently
    /// updated first. An empty query matches every note of the user.
    async fn search_notes(&self, user_id: &str, query: &str) -> PortResult<Vec<Note>>;
}

/// Credentials and browser login sessions.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Creates the user and its credentials together. Fails with
    /// `PortError::Conflict` if the email is already registered.
    async fn register_user(
        &self,
        user: UpsertUser,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user id, or `PortError::Unauthorized` for unknown or
    /// expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
