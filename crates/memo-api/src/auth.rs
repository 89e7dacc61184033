use std::sync::Arc;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use memo_db::Database;
use memo_db::models::UserRow;
use memo_types::api::{AckResponse, AuthResponse, LoginRequest, MeResponse, RegisterRequest};
use memo_types::models::User;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::{parse_timestamp, parse_uuid, token};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

const MIN_PASSWORD_LEN: usize = 6;

/// One message for unknown email and wrong password alike, so login
/// failures cannot be used to enumerate accounts.
pub const INVALID_CREDENTIALS: &str = "invalid email or password";

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.is_empty() || req.password.is_empty() || req.username.is_empty() {
        return Err(ApiError::Validation(
            "email, password and username are required".into(),
        ));
    }
    // character count, not byte length, so multibyte passwords measure
    // the same as they do to the person typing them
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }

    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Duplicate(
            "an account with this email already exists".into(),
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();

    if let Err(e) = state.db.create_user(
        &user_id.to_string(),
        &req.email,
        &req.username,
        &password_hash,
    ) {
        // two registrations racing on the same email: the uniqueness
        // constraint is the backstop
        if memo_db::is_constraint_violation(&e) {
            return Err(ApiError::Duplicate(
                "an account with this email already exists".into(),
            ));
        }
        return Err(e.into());
    }

    let row = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("user vanished after insert: {}", user_id))?;

    let token = token::issue(&state.jwt_secret, user_id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "registration complete".into(),
            user: user_from_row(row),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("email and password are required".into()));
    }

    let row = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or_else(|| ApiError::Auth(INVALID_CREDENTIALS.into()))?;

    let parsed_hash = PasswordHash::new(&row.password_hash)
        .map_err(|e| anyhow::anyhow!("stored hash unreadable for {}: {}", row.id, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Auth(INVALID_CREDENTIALS.into()))?;

    let user_id = parse_uuid(&row.id, "user id");
    let token = token::issue(&state.jwt_secret, user_id)?;

    Ok(Json(AuthResponse {
        message: "login successful".into(),
        user: user_from_row(row),
        token,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<MeResponse>, ApiError> {
    let row = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    Ok(Json(MeResponse {
        user: user_from_row(row),
    }))
}

/// Stateless: the client discards its token. Kept for API symmetry.
pub async fn logout() -> Json<AckResponse> {
    Json(AckResponse {
        message: "logged out".into(),
    })
}

fn user_from_row(row: UserRow) -> User {
    User {
        id: parse_uuid(&row.id, "user id"),
        email: row.email,
        username: row.username,
        created_at: parse_timestamp(&row.created_at),
    }
}
