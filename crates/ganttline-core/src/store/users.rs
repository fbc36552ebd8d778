//! User rows. Users belong to a project and are referenced by subtasks.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{GanttlineError, Result};
use crate::model::User;

/// Insert a user and return the stored row.
///
/// # Errors
///
/// Returns [`GanttlineError::ProjectNotFound`] if the project does not exist.
pub fn insert_user(conn: &Connection, project_id: i64, name: &str, color: &str) -> Result<User> {
    super::projects::require_project(conn, project_id)?;
    conn.execute(
        "INSERT INTO users (project_id, name, color) VALUES (?1, ?2, ?3)",
        params![project_id, name, color],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        project_id,
        name: name.to_string(),
        color: color.to_string(),
    })
}

/// Fetch a user by id.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the query fails.
pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, project_id, name, color FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// # Errors
///
/// Returns [`GanttlineError::UserNotFound`] if the row is absent.
pub fn require_user(conn: &Connection, id: i64) -> Result<User> {
    get_user(conn, id)?.ok_or(GanttlineError::UserNotFound(id))
}

/// Users of a project in id order.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the query fails.
pub fn list_users(conn: &Connection, project_id: i64) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, color FROM users WHERE project_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![project_id], row_to_user)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Update name and/or color.
///
/// # Errors
///
/// Returns [`GanttlineError::UserNotFound`] if no row matched.
pub fn update_user(
    conn: &Connection,
    id: i64,
    name: Option<&str>,
    color: Option<&str>,
) -> Result<()> {
    if let Some(name) = name {
        let changed = conn.execute("UPDATE users SET name = ?1 WHERE id = ?2", params![name, id])?;
        if changed == 0 {
            return Err(GanttlineError::UserNotFound(id));
        }
    }
    if let Some(color) = color {
        let changed =
            conn.execute("UPDATE users SET color = ?1 WHERE id = ?2", params![color, id])?;
        if changed == 0 {
            return Err(GanttlineError::UserNotFound(id));
        }
    }
    Ok(())
}

/// Delete a user, first clearing every subtask assignment that points at it.
/// Both statements run in one transaction.
///
/// # Errors
///
/// Returns [`GanttlineError::UserNotFound`] if no row matched; nothing is
/// changed in that case.
pub fn delete_user(conn: &Connection, id: i64) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("UPDATE subtasks SET user_id = NULL WHERE user_id = ?1", params![id])?;
    let changed = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(GanttlineError::UserNotFound(id));
    }
    tx.commit()?;
    Ok(())
}

/// Delete every user of a project. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the statement fails.
pub fn delete_users_for_project(conn: &Connection, project_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM users WHERE project_id = ?1", params![project_id])?)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
    })
}
