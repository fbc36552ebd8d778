//! Project rows.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{GanttlineError, Result};
use crate::model::Project;
use crate::timestamp;

/// Fields for a new project row. `name` must already be trimmed.
#[derive(Debug, Clone)]
pub struct NewProject<'a> {
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub password: Option<&'a str>,
}

/// Optional column updates; `None` leaves the column unchanged.
/// `password: Some(None)` clears the password.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub password: Option<Option<String>>,
}

impl ProjectChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.start_date.is_none() && self.password.is_none()
    }
}

/// Insert a project, deriving a unique slug from its name.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if any statement fails.
pub fn insert_project(conn: &Connection, project: &NewProject<'_>) -> Result<Project> {
    let slug = generate_slug(conn, project.name)?;
    let created_at_us = timestamp::now_us();
    conn.execute(
        "INSERT INTO projects (name, slug, password, start_date, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            project.name,
            slug,
            project.password.filter(|p| !p.is_empty()),
            project.start_date,
            created_at_us,
        ],
    )?;

    Ok(Project {
        id: conn.last_insert_rowid(),
        name: project.name.to_string(),
        slug,
        password: project.password.filter(|p| !p.is_empty()).map(String::from),
        start_date: project.start_date,
        created_at: timestamp::from_us(created_at_us),
    })
}

/// Fetch a project by id.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the query fails.
pub fn get_project(conn: &Connection, id: i64) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT id, name, slug, password, start_date, created_at_us
             FROM projects WHERE id = ?1",
            params![id],
            row_to_project,
        )
        .optional()?;
    Ok(project)
}

/// Like [`get_project`] but missing rows are an error.
///
/// # Errors
///
/// Returns [`GanttlineError::ProjectNotFound`] if the row is absent.
pub fn require_project(conn: &Connection, id: i64) -> Result<Project> {
    get_project(conn, id)?.ok_or(GanttlineError::ProjectNotFound(id))
}

/// All projects, newest id first.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the query fails.
pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, slug, password, start_date, created_at_us
         FROM projects ORDER BY id DESC",
    )?;
    let rows = stmt.query_map([], row_to_project)?;
    let projects = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(projects)
}

/// Apply the non-empty fields of `changes`.
///
/// # Errors
///
/// Returns [`GanttlineError::ProjectNotFound`] if no row matched.
pub fn update_project(conn: &Connection, id: i64, changes: &ProjectChanges) -> Result<()> {
    if let Some(ref name) = changes.name {
        touch(conn.execute("UPDATE projects SET name = ?1 WHERE id = ?2", params![name, id])?, id)?;
    }
    if let Some(start_date) = changes.start_date {
        touch(
            conn.execute(
                "UPDATE projects SET start_date = ?1 WHERE id = ?2",
                params![start_date, id],
            )?,
            id,
        )?;
    }
    if let Some(ref password) = changes.password {
        let password = password.as_deref().filter(|p| !p.is_empty());
        touch(
            conn.execute(
                "UPDATE projects SET password = ?1 WHERE id = ?2",
                params![password, id],
            )?,
            id,
        )?;
    }
    Ok(())
}

/// Overwrite the restorable attributes (name and start date). Slug and
/// password are left alone.
///
/// # Errors
///
/// Returns [`GanttlineError::ProjectNotFound`] if no row matched.
pub fn update_project_attributes(
    conn: &Connection,
    id: i64,
    name: &str,
    start_date: NaiveDate,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE projects SET name = ?1, start_date = ?2 WHERE id = ?3",
        params![name, start_date, id],
    )?;
    touch(changed, id)
}

/// Delete a project; users, tasks, subtasks, snapshots and events cascade.
///
/// # Errors
///
/// Returns [`GanttlineError::ProjectNotFound`] if no row matched.
pub fn delete_project(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
    touch(changed, id)
}

/// Derive a URL slug from `name`, unique across all projects.
///
/// Lower-cases the name, collapses every run of non `[a-z0-9]` characters
/// into `-`, and trims dashes. An empty result becomes `project`. Collisions
/// get `-1`, `-2`, ... appended.
///
/// # Errors
///
/// Returns [`GanttlineError::Storage`] if the uniqueness probe fails.
pub fn generate_slug(conn: &Connection, name: &str) -> Result<String> {
    let base = slugify(name);
    let mut candidate = base.clone();
    let mut counter = 1_u32;
    while slug_exists(conn, &candidate)? {
        candidate = format!("{base}-{counter}");
        counter += 1;
    }
    Ok(candidate)
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

fn slug_exists(conn: &Connection, slug: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE slug = ?1)",
        params![slug],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn touch(changed: usize, id: i64) -> Result<()> {
    if changed == 0 {
        Err(GanttlineError::ProjectNotFound(id))
    } else {
        Ok(())
    }
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        password: row.get(3)?,
        start_date: row.get(4)?,
        created_at: timestamp::from_us(row.get(5)?),
    })
}
