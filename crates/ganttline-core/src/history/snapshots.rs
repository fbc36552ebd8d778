//! Immutable full-state snapshots.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::codec;
use super::events::clamp_limit;
use crate::error::{GanttlineError, Result};
use crate::model::ProjectState;
use crate::store;
use crate::timestamp;

/// Listing row; the document itself is not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotMeta {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
}

pub struct SnapshotStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SnapshotStore<'conn> {
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Capture the project's live tree and store it. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns [`GanttlineError::ProjectNotFound`] if the project row is
    /// gone, or [`GanttlineError::Storage`] on database failure.
    pub fn create(&self, project_id: i64, description: Option<&str>) -> Result<i64> {
        let state = store::load_project_state(self.conn, project_id)?
            .ok_or(GanttlineError::ProjectNotFound(project_id))?;
        let document = codec::encode_to_string(&state);

        self.conn.execute(
            "INSERT INTO project_snapshots (project_id, snapshot_data, created_at_us, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![project_id, document, timestamp::now_us(), description],
        )?;
        let snapshot_id = self.conn.last_insert_rowid();

        tracing::info!(
            project_id,
            snapshot_id,
            users = state.users.len(),
            main_tasks = state.main_tasks.len(),
            subtasks = state.subtask_count(),
            "created snapshot"
        );
        Ok(snapshot_id)
    }

    /// Highest snapshot id of the project.
    ///
    /// # Errors
    ///
    /// Returns [`GanttlineError::Storage`] if the query fails.
    pub fn latest_id(&self, project_id: i64) -> Result<Option<i64>> {
        let id: Option<i64> = self.conn.query_row(
            "SELECT MAX(id) FROM project_snapshots WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Creation time of the most recent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GanttlineError::Storage`] if the query fails.
    pub fn latest_timestamp(&self, project_id: i64) -> Result<Option<DateTime<Utc>>> {
        let us: Option<i64> = self.conn.query_row(
            "SELECT MAX(created_at_us) FROM project_snapshots WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(us.map(timestamp::from_us))
    }

    /// Newest snapshots of a project, at most `limit` (clamped).
    ///
    /// # Errors
    ///
    /// Returns [`GanttlineError::Storage`] if the query fails.
    pub fn list_recent(&self, project_id: i64, limit: usize) -> Result<Vec<SnapshotMeta>> {
        let limit = i64::try_from(clamp_limit(limit)).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at_us, description
             FROM project_snapshots
             WHERE project_id = ?1
             ORDER BY created_at_us DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![project_id, limit], |row| {
            Ok(SnapshotMeta {
                id: row.get(0)?,
                created_at: timestamp::from_us(row.get(1)?),
                description: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Load and decode a snapshot. Returns the owning project id and state.
    ///
    /// # Errors
    ///
    /// Returns [`GanttlineError::SnapshotNotFound`] if no such row exists and
    /// [`GanttlineError::CorruptSnapshot`] if the document does not decode.
    pub fn fetch(&self, snapshot_id: i64) -> Result<(i64, ProjectState)> {
        let (project_id, raw): (i64, String) = self
            .conn
            .query_row(
                "SELECT project_id, snapshot_data FROM project_snapshots WHERE id = ?1",
                params![snapshot_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(GanttlineError::SnapshotNotFound(snapshot_id))?;

        let state = codec::decode_str(&raw)
            .map_err(|source| GanttlineError::CorruptSnapshot { snapshot_id, source })?;
        Ok((project_id, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::testing::seed_project;

    #[test]
    fn create_then_fetch_matches_live_tree() {
        let conn = db::open_in_memory().expect("db");
        let project = seed_project(&conn, "Roadmap");
        let user = store::users::insert_user(&conn, project, "Ada", "#f00").expect("user");
        let task = store::tasks::insert_main_task(&conn, project, "Build", 2).expect("task");
        store::subtasks::insert_subtask(&conn, task.id, "Wire", Some(user.id), 3).expect("sub");

        let snapshots = SnapshotStore::new(&conn);
        let id = snapshots.create(project, Some("first")).expect("create");
        let (owner, state) = snapshots.fetch(id).expect("fetch");

        assert_eq!(owner, project);
        assert_eq!(
            Some(state),
            store::load_project_state(&conn, project).expect("load")
        );
    }

    #[test]
    fn create_for_missing_project_fails() {
        let conn = db::open_in_memory().expect("db");
        let err = SnapshotStore::new(&conn).create(12, None).unwrap_err();
        assert!(matches!(err, GanttlineError::ProjectNotFound(12)));
    }

    #[test]
    fn latest_and_listing() {
        let conn = db::open_in_memory().expect("db");
        let project = seed_project(&conn, "Roadmap");
        let snapshots = SnapshotStore::new(&conn);
        assert_eq!(snapshots.latest_id(project).expect("latest"), None);
        assert_eq!(snapshots.latest_timestamp(project).expect("ts"), None);

        let a = snapshots.create(project, Some("a")).expect("a");
        let b = snapshots.create(project, None).expect("b");
        assert_eq!(snapshots.latest_id(project).expect("latest"), Some(b));
        assert!(snapshots.latest_timestamp(project).expect("ts").is_some());

        let listed = snapshots.list_recent(project, 10).expect("list");
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![b, a]);
        assert_eq!(listed[1].description.as_deref(), Some("a"));
        assert_eq!(listed[0].description, None);
    }

    #[test]
    fn fetch_reports_missing_and_corrupt() {
        let conn = db::open_in_memory().expect("db");
        let project = seed_project(&conn, "Roadmap");
        let snapshots = SnapshotStore::new(&conn);
        assert!(matches!(
            snapshots.fetch(40).unwrap_err(),
            GanttlineError::SnapshotNotFound(40)
        ));

        conn.execute(
            "INSERT INTO project_snapshots (project_id, snapshot_data, created_at_us)
             VALUES (?1, '{\"project\": 1}', 0)",
            params![project],
        )
        .expect("raw insert");
        let corrupt = conn.last_insert_rowid();
        let err = snapshots.fetch(corrupt).unwrap_err();
        assert!(matches!(
            err,
            GanttlineError::CorruptSnapshot { snapshot_id, .. } if snapshot_id == corrupt
        ));
    }

    #[test]
    fn snapshots_cascade_with_project() {
        let conn = db::open_in_memory().expect("db");
        let project = seed_project(&conn, "Roadmap");
        let snapshots = SnapshotStore::new(&conn);
        let id = snapshots.create(project, None).expect("create");
        store::projects::delete_project(&conn, project).expect("delete");
        assert!(matches!(
            snapshots.fetch(id).unwrap_err(),
            GanttlineError::SnapshotNotFound(_)
        ));
    }
}
