use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::token;

/// Identity resolved by `require_auth`, inserted into request extensions
/// for downstream handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Identity resolved by `optional_auth`. Always present on memo routes;
/// `None` means the request carried no usable token.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Uuid>);

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Extract and validate the bearer token; reject the request before it
/// reaches the handler when the token is missing or does not verify.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError::Auth("authentication token required".into()))?;

    let user_id = token::verify(&state.jwt_secret, token)
        .map_err(|_| ApiError::Auth("invalid token".into()))?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// Same extraction, but never blocks: the request proceeds anonymously
/// when no valid token accompanies it.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let user_id = bearer_token(&req).and_then(|t| token::verify(&state.jwt_secret, t).ok());

    req.extensions_mut().insert(MaybeUser(user_id));
    next.run(req).await
}
