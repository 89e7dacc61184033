use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Group, GroupSummary, Memo, User};

// -- JWT Claims --

/// JWT claims shared by the token issuer (memo-api::token) and the request
/// middleware. Canonical definition lives here in memo-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by both register and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}

// -- Groups --

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGroupResponse {
    pub message: String,
    pub group: Group,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupListResponse {
    pub groups: Vec<GroupSummary>,
}

// -- Memos --

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoContentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteMemoResponse {
    pub message: String,
    pub memo: Memo,
}
