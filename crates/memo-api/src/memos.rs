use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::error;
use uuid::Uuid;

use memo_db::models::MemoRow;
use memo_types::api::{DeleteMemoResponse, MemoContentRequest};
use memo_types::models::Memo;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::MaybeUser;
use crate::{parse_timestamp, parse_uuid};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Memo>>, ApiError> {
    // Run the blocking DB query off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_memos())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("memo list task failed")
        })??;

    Ok(Json(rows.into_iter().map(memo_from_row).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Memo>, ApiError> {
    let row = state
        .db
        .get_memo(&id.to_string())?
        .ok_or_else(|| ApiError::NotFound("memo not found".into()))?;

    Ok(Json(memo_from_row(row)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(MaybeUser(user_id)): Extension<MaybeUser>,
    Json(req): Json<MemoContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("memo content is required".into()));
    }

    let id = Uuid::new_v4();
    let author = user_id.map(|u| u.to_string());
    let row = state
        .db
        .insert_memo(&id.to_string(), content, author.as_deref(), None)?;

    Ok((StatusCode::CREATED, Json(memo_from_row(row))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MemoContentRequest>,
) -> Result<Json<Memo>, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("memo content is required".into()));
    }

    let row = state
        .db
        .update_memo(&id.to_string(), content)?
        .ok_or_else(|| ApiError::NotFound("memo not found".into()))?;

    Ok(Json(memo_from_row(row)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteMemoResponse>, ApiError> {
    let row = state
        .db
        .delete_memo(&id.to_string())?
        .ok_or_else(|| ApiError::NotFound("memo not found".into()))?;

    Ok(Json(DeleteMemoResponse {
        message: "memo deleted".into(),
        memo: memo_from_row(row),
    }))
}

fn memo_from_row(row: MemoRow) -> Memo {
    Memo {
        id: parse_uuid(&row.id, "memo id"),
        content: row.content,
        user_id: row.user_id.as_deref().map(|u| parse_uuid(u, "memo author")),
        group_id: row.group_id.as_deref().map(|g| parse_uuid(g, "memo group")),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}
