use crate::Database;
use crate::models::{GroupRow, GroupSummaryRow, MemoRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, password_hash) VALUES (?1, ?2, ?3, ?4)",
                (id, email, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Groups --

    /// Insert a group together with its owner membership row. Both writes
    /// run in one transaction: a failure of either leaves neither behind.
    pub fn create_group_with_owner(
        &self,
        group_id: &str,
        membership_id: &str,
        name: &str,
        description: &str,
        owner_id: &str,
    ) -> Result<GroupRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO groups (id, name, description, owner_id) VALUES (?1, ?2, ?3, ?4)",
                (group_id, name, description, owner_id),
            )?;
            tx.execute(
                "INSERT INTO group_members (id, group_id, user_id, role)
                 VALUES (?1, ?2, ?3, 'owner')",
                (membership_id, group_id, owner_id),
            )?;

            let row = tx.query_row(
                "SELECT id, name, description, owner_id, created_at FROM groups WHERE id = ?1",
                [group_id],
                |row| {
                    Ok(GroupRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        owner_id: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )?;

            tx.commit()?;
            Ok(row)
        })
    }

    pub fn list_groups_for_user(&self, user_id: &str) -> Result<Vec<GroupSummaryRow>> {
        self.with_conn(|conn| query_groups_for_user(conn, user_id))
    }

    pub fn membership_role(&self, group_id: &str, user_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let role = conn
                .query_row(
                    "SELECT role FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                    (group_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(role)
        })
    }

    /// Memberships and group memos go with it via FK cascade.
    pub fn delete_group(&self, group_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM groups WHERE id = ?1", [group_id])?;
            Ok(())
        })
    }

    // -- Memos --

    pub fn insert_memo(
        &self,
        id: &str,
        content: &str,
        user_id: Option<&str>,
        group_id: Option<&str>,
    ) -> Result<MemoRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO memos (id, content, user_id, group_id) VALUES (?1, ?2, ?3, ?4)",
                (id, content, user_id, group_id),
            )?;
            query_memo(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("memo vanished after insert: {}", id))
        })
    }

    pub fn list_memos(&self) -> Result<Vec<MemoRow>> {
        self.with_conn(|conn| {
            // rowid breaks same-second ties so newest-first stays stable
            let mut stmt = conn.prepare(
                "SELECT id, content, user_id, group_id, created_at, updated_at
                 FROM memos
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], memo_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_memo(&self, id: &str) -> Result<Option<MemoRow>> {
        self.with_conn(|conn| query_memo(conn, id))
    }

    /// Returns None when no memo with that id exists.
    pub fn update_memo(&self, id: &str, content: &str) -> Result<Option<MemoRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE memos SET content = ?2, updated_at = datetime('now') WHERE id = ?1",
                (id, content),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_memo(conn, id)
        })
    }

    /// Deletes and returns the removed row, None when absent.
    pub fn delete_memo(&self, id: &str) -> Result<Option<MemoRow>> {
        self.with_conn(|conn| {
            let Some(row) = query_memo(conn, id)? else {
                return Ok(None);
            };
            conn.execute("DELETE FROM memos WHERE id = ?1", [id])?;
            Ok(Some(row))
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column is a compile-time name, never user input
    let sql = format!(
        "SELECT id, email, username, password_hash, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                username: row.get(2)?,
                password_hash: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_groups_for_user(conn: &Connection, user_id: &str) -> Result<Vec<GroupSummaryRow>> {
    let mut stmt = conn.prepare(
        "SELECT
             g.id,
             g.name,
             g.description,
             g.owner_id,
             u.username,
             g.created_at,
             gm.role,
             (SELECT COUNT(*) FROM group_members WHERE group_id = g.id)
         FROM groups g
         JOIN group_members gm ON g.id = gm.group_id
         JOIN users u ON g.owner_id = u.id
         WHERE gm.user_id = ?1
         ORDER BY g.created_at DESC, g.rowid DESC",
    )?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(GroupSummaryRow {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                owner_id: row.get(3)?,
                owner_name: row.get(4)?,
                created_at: row.get(5)?,
                my_role: row.get(6)?,
                member_count: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_memo(conn: &Connection, id: &str) -> Result<Option<MemoRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, user_id, group_id, created_at, updated_at FROM memos WHERE id = ?1",
    )?;
    let row = stmt.query_row([id], memo_from_row).optional()?;
    Ok(row)
}

fn memo_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<MemoRow, rusqlite::Error> {
    Ok(MemoRow {
        id: row.get(0)?,
        content: row.get(1)?,
        user_id: row.get(2)?,
        group_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
