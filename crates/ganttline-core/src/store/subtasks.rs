//! Subtask rows.
//!
//! Within a main task, subtask positions are unique and contiguous from 0.
//! Deleting a subtask shifts every later sibling down by one inside the same
//! transaction, so the sequence never has a gap or a duplicate.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{GanttlineError, Result};
use crate::model::Subtask;

/// Optional column updates. `user_id: Some(None)` unassigns the subtask.
#[derive(Debug, Clone, Default)]
pub struct SubtaskChanges {
    pub name: Option<String>,
    pub user_id: Option<Option<i64>>,
    pub duration_days: Option<i64>,
}

impl SubtaskChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.user_id.is_none() && self.duration_days.is_none()
    }
}

/// Durations below one day are stored as one day.
#[must_use]
pub const fn clamp_duration(days: i64) -> i64 {
    if days < 1 { 1 } else { days }
}

/// Append a subtask after the last sibling.
///
/// # Errors
///
/// Returns [`GanttlineError::MainTaskNotFound`] if the parent does not exist.
pub fn insert_subtask(
    conn: &Connection,
    main_task_id: i64,
    name: &str,
    user_id: Option<i64>,
    duration_days: i64,
) -> Result<Subtask> {
    super::tasks::require_main_task(conn, main_task_id)?;
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM subtasks WHERE main_task_id = ?1",
        params![main_task_id],
        |row| row.get(0),
    )?;
    insert_subtask_at(conn, main_task_id, name, user_id, duration_days, position)
}

/// Insert a subtask at an explicit position.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the insert fails, including when
/// `user_id` does not reference an existing user.
pub fn insert_subtask_at(
    conn: &Connection,
    main_task_id: i64,
    name: &str,
    user_id: Option<i64>,
    duration_days: i64,
    position: i64,
) -> Result<Subtask> {
    let duration_days = clamp_duration(duration_days);
    conn.execute(
        "INSERT INTO subtasks (main_task_id, name, user_id, duration_days, position)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![main_task_id, name, user_id, duration_days, position],
    )?;
    Ok(Subtask {
        id: conn.last_insert_rowid(),
        main_task_id,
        name: name.to_string(),
        user_id,
        duration_days,
        position,
    })
}

/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the query fails.
pub fn get_subtask(conn: &Connection, id: i64) -> Result<Option<Subtask>> {
    let sub = conn
        .query_row(
            "SELECT id, main_task_id, name, user_id, duration_days, position
             FROM subtasks WHERE id = ?1",
            params![id],
            row_to_subtask,
        )
        .optional()?;
    Ok(sub)
}

/// # Errors
///
/// Returns [`GanttlineError::SubtaskNotFound`] if the row is absent.
pub fn require_subtask(conn: &Connection, id: i64) -> Result<Subtask> {
    get_subtask(conn, id)?.ok_or(GanttlineError::SubtaskNotFound(id))
}

/// Subtasks of a main task in position order.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the query fails.
pub fn list_subtasks(conn: &Connection, main_task_id: i64) -> Result<Vec<Subtask>> {
    let mut stmt = conn.prepare(
        "SELECT id, main_task_id, name, user_id, duration_days, position
         FROM subtasks WHERE main_task_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![main_task_id], row_to_subtask)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Apply the non-empty fields of `changes`.
///
/// # Errors
///
/// Returns [`GanttlineError::SubtaskNotFound`] if no row matched.
pub fn update_subtask(conn: &Connection, id: i64, changes: &SubtaskChanges) -> Result<()> {
    let mut touched = Vec::with_capacity(3);
    if let Some(ref name) = changes.name {
        touched.push(conn.execute("UPDATE subtasks SET name = ?1 WHERE id = ?2", params![name, id])?);
    }
    if let Some(user_id) = changes.user_id {
        touched.push(conn.execute(
            "UPDATE subtasks SET user_id = ?1 WHERE id = ?2",
            params![user_id, id],
        )?);
    }
    if let Some(days) = changes.duration_days {
        touched.push(conn.execute(
            "UPDATE subtasks SET duration_days = ?1 WHERE id = ?2",
            params![clamp_duration(days), id],
        )?);
    }
    if touched.contains(&0) {
        return Err(GanttlineError::SubtaskNotFound(id));
    }
    Ok(())
}

/// Delete a subtask and close the gap it leaves in its siblings' positions.
/// Returns the removed row.
///
/// # Errors
///
/// Returns [`GanttlineError::SubtaskNotFound`] if the row does not exist.
/// On any failure the transaction is rolled back and positions are intact.
pub fn delete_subtask(conn: &Connection, id: i64) -> Result<Subtask> {
    let tx = conn.unchecked_transaction()?;
    let removed = require_subtask(&tx, id)?;
    tx.execute("DELETE FROM subtasks WHERE id = ?1", params![id])?;
    tx.execute(
        "UPDATE subtasks SET position = position - 1
         WHERE main_task_id = ?1 AND position > ?2",
        params![removed.main_task_id, removed.position],
    )?;
    tx.commit()?;
    Ok(removed)
}

/// Delete every subtask under the project's main tasks. Returns the number
/// of rows removed.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the statement fails.
pub fn delete_subtasks_for_project(conn: &Connection, project_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM subtasks
         WHERE main_task_id IN (SELECT id FROM main_tasks WHERE project_id = ?1)",
        params![project_id],
    )?)
}

fn row_to_subtask(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: row.get(0)?,
        main_task_id: row.get(1)?,
        name: row.get(2)?,
        user_id: row.get(3)?,
        duration_days: row.get(4)?,
        position: row.get(5)?,
    })
}
