//! Main task rows.
//!
//! Main task positions define display order. New tasks are appended after
//! the current maximum; deletion does not renumber the remaining tasks.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{GanttlineError, Result};
use crate::model::MainTask;

/// Append a main task at the end of the project's task list.
///
/// # Errors
///
/// Returns [`GanttlineError::ProjectNotFound`] if the project does not exist.
pub fn insert_main_task(
    conn: &Connection,
    project_id: i64,
    name: &str,
    start_offset_days: i64,
) -> Result<MainTask> {
    super::projects::require_project(conn, project_id)?;
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM main_tasks WHERE project_id = ?1",
        params![project_id],
        |row| row.get(0),
    )?;
    insert_main_task_at(conn, project_id, name, position, start_offset_days)
}

/// Insert a main task at an explicit position.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the insert fails.
pub fn insert_main_task_at(
    conn: &Connection,
    project_id: i64,
    name: &str,
    position: i64,
    start_offset_days: i64,
) -> Result<MainTask> {
    conn.execute(
        "INSERT INTO main_tasks (project_id, name, position, start_offset_days)
         VALUES (?1, ?2, ?3, ?4)",
        params![project_id, name, position, start_offset_days],
    )?;
    Ok(MainTask {
        id: conn.last_insert_rowid(),
        project_id,
        name: name.to_string(),
        position,
        start_offset_days,
    })
}

/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the query fails.
pub fn get_main_task(conn: &Connection, id: i64) -> Result<Option<MainTask>> {
    let task = conn
        .query_row(
            "SELECT id, project_id, name, position, start_offset_days
             FROM main_tasks WHERE id = ?1",
            params![id],
            row_to_main_task,
        )
        .optional()?;
    Ok(task)
}

/// # Errors
///
/// Returns [`GanttlineError::MainTaskNotFound`] if the row is absent.
pub fn require_main_task(conn: &Connection, id: i64) -> Result<MainTask> {
    get_main_task(conn, id)?.ok_or(GanttlineError::MainTaskNotFound(id))
}

/// Main tasks of a project in display order.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the query fails.
pub fn list_main_tasks(conn: &Connection, project_id: i64) -> Result<Vec<MainTask>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, position, start_offset_days
         FROM main_tasks WHERE project_id = ?1 ORDER BY position ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![project_id], row_to_main_task)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Update name and/or start offset.
///
/// # Errors
///
/// Returns [`GanttlineError::MainTaskNotFound`] if no row matched.
pub fn update_main_task(
    conn: &Connection,
    id: i64,
    name: Option<&str>,
    start_offset_days: Option<i64>,
) -> Result<()> {
    if let Some(name) = name {
        let changed =
            conn.execute("UPDATE main_tasks SET name = ?1 WHERE id = ?2", params![name, id])?;
        if changed == 0 {
            return Err(GanttlineError::MainTaskNotFound(id));
        }
    }
    if let Some(offset) = start_offset_days {
        let changed = conn.execute(
            "UPDATE main_tasks SET start_offset_days = ?1 WHERE id = ?2",
            params![offset, id],
        )?;
        if changed == 0 {
            return Err(GanttlineError::MainTaskNotFound(id));
        }
    }
    Ok(())
}

/// Delete a main task; its subtasks cascade.
///
/// # Errors
///
/// Returns [`GanttlineError::MainTaskNotFound`] if no row matched.
pub fn delete_main_task(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM main_tasks WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(GanttlineError::MainTaskNotFound(id));
    }
    Ok(())
}

/// Delete every main task of a project. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the statement fails.
pub fn delete_main_tasks_for_project(conn: &Connection, project_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM main_tasks WHERE project_id = ?1",
        params![project_id],
    )?)
}

fn row_to_main_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<MainTask> {
    Ok(MainTask {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
        start_offset_days: row.get(4)?,
    })
}
