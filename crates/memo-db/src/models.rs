/// Database row types — these map directly to SQLite rows.
/// Distinct from memo-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub created_at: String,
}

/// One row of the caller's group list: group joined with the owner's
/// username, the caller's membership role and the member count.
pub struct GroupSummaryRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub owner_name: String,
    pub created_at: String,
    pub my_role: String,
    pub member_count: i64,
}

pub struct MemoRow {
    pub id: String,
    pub content: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
