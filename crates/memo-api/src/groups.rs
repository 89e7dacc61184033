use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{error, warn};
use uuid::Uuid;

use memo_db::models::{GroupRow, GroupSummaryRow};
use memo_types::api::{AckResponse, CreateGroupRequest, CreateGroupResponse, GroupListResponse};
use memo_types::models::{Group, GroupRole, GroupSummary};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::{parse_timestamp, parse_uuid};

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<GroupListResponse>, ApiError> {
    // Run the blocking DB query off the async runtime
    let db = state.clone();
    let uid = user_id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_groups_for_user(&uid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("group list task failed")
        })??;

    let groups = rows.into_iter().map(summary_from_row).collect();
    Ok(Json(GroupListResponse { groups }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("group name is required".into()));
    }
    let description = req.description.unwrap_or_default();

    let group_id = Uuid::new_v4();
    let membership_id = Uuid::new_v4();

    let row = state.db.create_group_with_owner(
        &group_id.to_string(),
        &membership_id.to_string(),
        name,
        &description,
        &user_id.to_string(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(CreateGroupResponse {
            message: "group created".into(),
            group: group_from_row(row),
        }),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<AckResponse>, ApiError> {
    let role = state
        .db
        .membership_role(&group_id.to_string(), &user_id.to_string())?;

    // No membership and a non-owner role get the same answer, so callers
    // cannot probe which groups exist.
    let is_owner = matches!(
        role.as_deref().and_then(GroupRole::parse),
        Some(GroupRole::Owner)
    );
    if !is_owner {
        return Err(ApiError::Permission(
            "you do not have permission to delete this group".into(),
        ));
    }

    state.db.delete_group(&group_id.to_string())?;

    Ok(Json(AckResponse {
        message: "group deleted".into(),
    }))
}

fn group_from_row(row: GroupRow) -> Group {
    Group {
        id: parse_uuid(&row.id, "group id"),
        name: row.name,
        description: row.description,
        owner_id: parse_uuid(&row.owner_id, "owner id"),
        created_at: parse_timestamp(&row.created_at),
    }
}

fn summary_from_row(row: GroupSummaryRow) -> GroupSummary {
    let my_role = GroupRole::parse(&row.my_role).unwrap_or_else(|| {
        warn!("Unknown role '{}' on group '{}'", row.my_role, row.id);
        GroupRole::Member
    });

    GroupSummary {
        id: parse_uuid(&row.id, "group id"),
        name: row.name,
        description: row.description,
        owner_id: parse_uuid(&row.owner_id, "owner id"),
        owner_name: row.owner_name,
        created_at: parse_timestamp(&row.created_at),
        my_role,
        member_count: row.member_count,
    }
}
