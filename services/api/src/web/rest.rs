//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the note endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{self, LoginRequest, SignupRequest, UserResponse};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use notecode_core::domain::{NewNote, Note, NoteUpdate};
use notecode_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::current_user_handler,
        list_notes_handler,
        search_notes_handler,
        get_note_handler,
        create_note_handler,
        update_note_handler,
        delete_note_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            UserResponse,
            NoteResponse,
            CreateNoteRequest,
            UpdateNoteRequest
        )
    ),
    tags(
        (name = "NoteCode API", description = "Per-user storage and search of text and code notes.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A note as returned by every note endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            user_id: note.user_id,
            title: note.title,
            content: note.content,
            language: note.language,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub language: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub language: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Maps a port failure onto an HTTP status. Unexpected failures are logged and
/// answered with a generic message.
pub(crate) fn port_error_response(action: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            error!("Failed to {}: {}", action, msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}", action),
            )
        }
    }
}

fn notes_response(notes: Vec<Note>) -> Json<Vec<NoteResponse>> {
    Json(notes.into_iter().map(NoteResponse::from).collect())
}

fn blank_title() -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, "Title is required".to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's notes, most recently updated first.
#[utoipa::path(
    get,
    path = "/api/notes",
    responses(
        (status = 200, description = "The caller's notes", body = [NoteResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<Vec<NoteResponse>>, (StatusCode, String)> {
    let notes = app_state
        .store
        .get_notes_by_user_id(&user_id)
        .await
        .map_err(|e| port_error_response("list notes", e))?;
    Ok(notes_response(notes))
}

/// Search the caller's notes by title.
///
/// Matches `q` as a case-insensitive substring of the title. A missing or
/// empty `q` returns every note.
#[utoipa::path(
    get,
    path = "/api/notes/search",
    params(
        ("q" = Option<String>, Query, description = "Substring to look for in note titles.")
    ),
    responses(
        (status = 200, description = "Matching notes, most recently updated first", body = [NoteResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn search_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<NoteResponse>>, (StatusCode, String)> {
    let query = params.q.unwrap_or_default();
    let notes = app_state
        .store
        .search_notes(&user_id, &query)
        .await
        .map_err(|e| port_error_response("search notes", e))?;
    Ok(notes_response(notes))
}

/// Fetch one of the caller's notes.
#[utoipa::path(
    get,
    path = "/api/notes/{id}",
    params(("id" = Uuid, Path, description = "The note id.")),
    responses(
        (status = 200, description = "The note", body = NoteResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "No such note for this user")
    )
)]
pub async fn get_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteResponse>, (StatusCode, String)> {
    let note = app_state
        .store
        .get_note_by_id(id, &user_id)
        .await
        .map_err(|e| port_error_response("load note", e))?
        .ok_or((StatusCode::NOT_FOUND, "Note not found".to_string()))?;
    Ok(Json(NoteResponse::from(note)))
}

/// Create a note owned by the caller.
#[utoipa::path(
    post,
    path = "/api/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Blank title"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.title.trim().is_empty() {
        return Err(blank_title());
    }
    let language = req.language.filter(|l| !l.trim().is_empty());

    let note = app_state
        .store
        .create_note(NewNote::new(user_id, req.title, req.content, language))
        .await
        .map_err(|e| port_error_response("create note", e))?;
    info!("Created note {}", note.id);

    Ok((StatusCode::CREATED, Json(NoteResponse::from(note))))
}

/// Update any subset of a note's title, content and language.
#[utoipa::path(
    patch,
    path = "/api/notes/{id}",
    params(("id" = Uuid, Path, description = "The note id.")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "The updated note", body = NoteResponse),
        (status = 400, description = "Blank title or malformed id"),
        (status = 404, description = "No such note for this user")
    )
)]
pub async fn update_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>, (StatusCode, String)> {
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(blank_title());
    }
    let updates = NoteUpdate {
        title: req.title,
        content: req.content,
        language: req.language,
    };

    let note = app_state
        .store
        .update_note(id, &user_id, updates)
        .await
        .map_err(|e| port_error_response("update note", e))?;
    Ok(Json(NoteResponse::from(note)))
}

/// Delete one of the caller's notes. Succeeds even if nothing matched.
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    params(("id" = Uuid, Path, description = "The note id.")),
    responses(
        (status = 204, description = "Note deleted or already absent"),
        (status = 400, description = "Malformed id")
    )
)]
pub async fn delete_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    app_state
        .store
        .delete_note(id, &user_id)
        .await
        .map_err(|e| port_error_response("delete note", e))?;
    Ok(StatusCode::NO_CONTENT)
}
