//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the storage ports. Used by the test suites
//! and for running the service without a database (`STORE_BACKEND=memory`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notecode_core::domain::{
    title_matches, NewNote, Note, NoteUpdate, UpsertUser, User, UserCredentials,
};
use notecode_core::ports::{AuthStore, EntityStore, PortError, PortResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    notes: HashMap<Uuid, Note>,
    // keyed by email
    credentials: HashMap<String, UserCredentials>,
    sessions: HashMap<String, (String, DateTime<Utc>)>,
}

/// In-memory store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut notes: Vec<Note>) -> Vec<Note> {
    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    notes
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_user(&self, id: &str) -> PortResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn upsert_user(&self, user: UpsertUser) -> PortResult<User> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let row = tables.users.entry(user.id.clone()).or_insert_with(|| User {
            id: user.id.clone(),
            email: None,
            first_name: None,
            last_name: None,
            profile_image_url: None,
            created_at: now,
            updated_at: now,
        });
        // Unsupplied fields keep their stored value.
        if let Some(email) = user.email {
            row.email = Some(email);
        }
        if let Some(first_name) = user.first_name {
            row.first_name = Some(first_name);
        }
        if let Some(last_name) = user.last_name {
            row.last_name = Some(last_name);
        }
        if let Some(profile_image_url) = user.profile_image_url {
            row.profile_image_url = Some(profile_image_url);
        }
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn get_notes_by_user_id(&self, user_id: &str) -> PortResult<Vec<Note>> {
        let tables = self.tables.read().await;
        let notes = tables
            .notes
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(notes))
    }

    async fn get_note_by_id(&self, id: Uuid, user_id: &str) -> PortResult<Option<Note>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .get(&id)
            .filter(|n| n.user_id == user_id)
            .cloned())
    }

    async fn create_note(&self, note: NewNote) -> PortResult<Note> {
        let mut tables = self.tables.write().await;
        // Mirrors the foreign key on notes.user_id.
        if !tables.users.contains_key(&note.user_id) {
            return Err(PortError::Unexpected(format!(
                "User {} does not exist",
                note.user_id
            )));
        }
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: note.user_id,
            title: note.title,
            content: note.content,
            language: note.language,
            created_at: now,
            updated_at: now,
        };
        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update_note(
        &self,
        id: Uuid,
        user_id: &str,
        updates: NoteUpdate,
    ) -> PortResult<Note> {
        let mut tables = self.tables.write().await;
        let note = tables
            .notes
            .get_mut(&id)
            .filter(|n| n.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Note {} not found", id)))?;
        updates.apply_to(note);
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn delete_note(&self, id: Uuid, user_id: &str) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if tables.notes.get(&id).is_some_and(|n| n.user_id == user_id) {
            tables.notes.remove(&id);
        }
        Ok(())
    }

    async fn search_notes(&self, user_id: &str, query: &str) -> PortResult<Vec<Note>> {
        let tables = self.tables.read().await;
        let notes = tables
            .notes
            .values()
            .filter(|n| n.user_id == user_id && title_matches(&n.title, query))
            .cloned()
            .collect();
        Ok(newest_first(notes))
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn register_user(
        &self,
        user: UpsertUser,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.credentials.contains_key(email) {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                email
            )));
        }
        if tables.users.contains_key(&user.id) {
            return Err(PortError::Conflict(format!("User {} already exists", user.id)));
        }
        let now = Utc::now();
        let row = User {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image_url: user.profile_image_url,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(row.id.clone(), row.clone());
        tables.credentials.insert(
            email.to_string(),
            UserCredentials {
                user_id: row.id.clone(),
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(row)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables
            .read()
            .await
            .credentials
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No credentials for {}", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        tables.sessions.retain(|_, (_, expires)| *expires > now);
        tables
            .sessions
            .insert(session_id.to_string(), (user_id.to_string(), expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        let tables = self.tables.read().await;
        match tables.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(user_id.clone()),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.sessions.remove(session_id);
        Ok(())
    }
}
