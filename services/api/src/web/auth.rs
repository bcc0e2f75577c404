//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and the current user.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use notecode_core::domain::{UpsertUser, User};
use notecode_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::web::middleware::{session_cookie, AuthUser};
use crate::web::rest::port_error_response;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The public view of a user.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image_url: user.profile_image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn session_cookie_header(session_id: &str, max_age_secs: i64, secure: bool) -> String {
    format!(
        "session={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        if secure { " Secure;" } else { "" },
        max_age_secs
    )
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Creates an auth session for `user_id` and returns the matching `Set-Cookie` value.
async fn start_session(
    state: &AppState,
    config: &Config,
    user_id: &str,
) -> Result<String, (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(config.session_ttl_days);

    state
        .auth
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| port_error_response("create session", e))?;

    Ok(session_cookie_header(
        &auth_session_id,
        ttl.num_seconds(),
        config.cookie_secure,
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password are required".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    let profile = UpsertUser {
        id: Uuid::new_v4().to_string(),
        email: Some(email.clone()),
        first_name: blank_to_none(req.first_name),
        last_name: blank_to_none(req.last_name),
        profile_image_url: blank_to_none(req.profile_image_url),
    };
    let user = state
        .auth
        .register_user(profile, &email, &password_hash)
        .await
        .map_err(|e| port_error_response("create user", e))?;
    info!("Registered user {}", user.id);

    let cookie = start_session(&state, &state.config, &user.id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /api/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        )
    };

    let email = normalize_email(&req.email);
    let user_creds = state
        .auth
        .get_credentials_by_email(&email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => {
                warn!("Login attempt for unknown email");
                invalid()
            }
            e => port_error_response("look up credentials", e),
        })?;

    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!("Wrong password for user {}", user_creds.user_id);
        return Err(invalid());
    }

    // Every successful authentication re-applies the profile and refreshes updated_at.
    let existing = state
        .store
        .get_user(&user_creds.user_id)
        .await
        .map_err(|e| port_error_response("load user", e))?
        .ok_or_else(invalid)?;
    let user = state
        .store
        .upsert_user(UpsertUser::from(&existing))
        .await
        .map_err(|e| port_error_response("update user", e))?;
    info!("User {} logged in", user.id);

    let cookie = start_session(&state, &state.config, &user.id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /api/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_cookie(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .auth
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| port_error_response("logout", e))?;

    let cookie = session_cookie_header("", 0, state.config.cookie_secure);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /api/auth/user - The currently authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn current_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user = state
        .store
        .get_user(&user_id)
        .await
        .map_err(|e| port_error_response("load user", e))?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;
    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_carries_secure_flag_only_when_configured() {
        let secure = session_cookie_header("abc", 60, true);
        assert_eq!(
            secure,
            "session=abc; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=60"
        );
        let plain = session_cookie_header("abc", 60, false);
        assert_eq!(plain, "session=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=60");
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
