//! Point-in-time restore of a project's entity tree.
//!
//! Restore replaces every live user, main task and subtask of the project
//! with the snapshot's contents inside one transaction. Rows are re-inserted
//! with fresh ids; subtask assignments are remapped from the snapshot's user
//! ids to the new ones. The project's slug and password are left as they are.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;

use super::snapshots::SnapshotStore;
use super::tracker::{ChangeDescriptor, ChangeTracker, SnapshotPolicy, TrackOutcome};
use crate::error::Result;
use crate::model::entity::DEFAULT_USER_NAME;
use crate::model::{EntityType, EventType, ProjectState};
use crate::store;

/// Summary of a completed restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub project_id: i64,
    pub snapshot_id: i64,
    pub users: usize,
    pub main_tasks: usize,
    pub subtasks: usize,
    /// `None` when the restore committed but recording it failed.
    pub tracked: Option<TrackOutcome>,
}

pub struct RestoreEngine<'conn> {
    conn: &'conn Connection,
    policy: SnapshotPolicy,
}

impl<'conn> RestoreEngine<'conn> {
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_policy(conn, SnapshotPolicy::default())
    }

    /// Engine whose follow-up tracking uses `policy`.
    #[allow(clippy::missing_const_for_fn)]
    pub fn with_policy(conn: &'conn Connection, policy: SnapshotPolicy) -> Self {
        Self { conn, policy }
    }

    /// Replace the live tree of the snapshot's project with the snapshot.
    ///
    /// # Errors
    ///
    /// - [`crate::GanttlineError::SnapshotNotFound`] if the id is unknown
    /// - [`crate::GanttlineError::CorruptSnapshot`] if the document does not
    ///   decode
    /// - [`crate::GanttlineError::ProjectNotFound`] if the project row is gone
    /// - [`crate::GanttlineError::Storage`] if any write fails
    ///
    /// On error nothing is changed. A failure to record the restore in the
    /// change log after commit is not an error.
    pub fn restore(&self, snapshot_id: i64) -> Result<RestoreOutcome> {
        let (project_id, state) = SnapshotStore::new(self.conn).fetch(snapshot_id)?;
        let mut outcome = self.replace_tree(project_id, snapshot_id, &state)?;
        tracing::info!(
            project_id,
            snapshot_id,
            users = outcome.users,
            main_tasks = outcome.main_tasks,
            subtasks = outcome.subtasks,
            "restored project from snapshot"
        );

        outcome.tracked =
            ChangeTracker::with_policy(self.conn, self.policy).track_best_effort(&ChangeDescriptor {
                project_id,
                event_type: EventType::RestoreSnapshot,
                entity_type: EntityType::Project,
                entity_id: Some(project_id),
                changes: json!({ "snapshot_id": snapshot_id }),
                description: Some("Restored from snapshot".to_string()),
            });
        Ok(outcome)
    }

    fn replace_tree(
        &self,
        project_id: i64,
        snapshot_id: i64,
        state: &ProjectState,
    ) -> Result<RestoreOutcome> {
        // Rolled back on drop unless committed.
        let tx = self.conn.unchecked_transaction()?;

        store::subtasks::delete_subtasks_for_project(&tx, project_id)?;
        store::tasks::delete_main_tasks_for_project(&tx, project_id)?;
        store::users::delete_users_for_project(&tx, project_id)?;

        store::projects::update_project_attributes(
            &tx,
            project_id,
            &state.project.name,
            state.project.start_date,
        )?;

        let mut user_ids: HashMap<i64, i64> = HashMap::with_capacity(state.users.len());
        for user in &state.users {
            // Legacy documents may hold blank names, which the users table rejects.
            let name = match user.name.trim() {
                "" => DEFAULT_USER_NAME,
                _ => user.name.as_str(),
            };
            let inserted = store::users::insert_user(&tx, project_id, name, &user.color)?;
            user_ids.insert(user.id, inserted.id);
        }

        let mut subtasks = 0;
        for task in &state.main_tasks {
            let inserted = store::tasks::insert_main_task_at(
                &tx,
                project_id,
                &task.name,
                task.position,
                task.start_offset_days,
            )?;
            for sub in &task.subtasks {
                let user_id = sub.user_id.and_then(|old| user_ids.get(&old).copied());
                store::subtasks::insert_subtask_at(
                    &tx,
                    inserted.id,
                    &sub.name,
                    user_id,
                    sub.duration_days,
                    sub.position,
                )?;
                subtasks += 1;
            }
        }

        tx.commit()?;
        Ok(RestoreOutcome {
            project_id,
            snapshot_id,
            users: state.users.len(),
            main_tasks: state.main_tasks.len(),
            subtasks,
            tracked: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::testing::seed_project;
    use crate::GanttlineError;

    #[test]
    fn restore_unknown_snapshot_fails() {
        let conn = db::open_in_memory().expect("db");
        let err = RestoreEngine::new(&conn).restore(8).unwrap_err();
        assert!(matches!(err, GanttlineError::SnapshotNotFound(8)));
    }

    #[test]
    fn restore_remaps_user_references() {
        let conn = db::open_in_memory().expect("db");
        let project = seed_project(&conn, "Roadmap");
        let ada = store::users::insert_user(&conn, project, "Ada", "#f00").expect("ada");
        let task = store::tasks::insert_main_task(&conn, project, "Build", 0).expect("task");
        store::subtasks::insert_subtask(&conn, task.id, "Wire", Some(ada.id), 2).expect("sub");
        let snapshot = SnapshotStore::new(&conn).create(project, None).expect("snapshot");

        store::users::delete_user(&conn, ada.id).expect("delete ada");
        let outcome = RestoreEngine::new(&conn).restore(snapshot).expect("restore");
        assert_eq!((outcome.users, outcome.main_tasks, outcome.subtasks), (1, 1, 1));
        assert_eq!(outcome.snapshot_id, snapshot);

        let state = store::load_project_state(&conn, project).expect("load").expect("exists");
        let new_ada = state.users[0].id;
        assert_ne!(new_ada, ada.id);
        assert_eq!(state.main_tasks[0].subtasks[0].user_id, Some(new_ada));
    }

    #[test]
    fn restore_records_an_event() {
        let conn = db::open_in_memory().expect("db");
        let project = seed_project(&conn, "Roadmap");
        let snapshot = SnapshotStore::new(&conn).create(project, None).expect("snapshot");

        let outcome = RestoreEngine::new(&conn).restore(snapshot).expect("restore");
        let tracked = outcome.tracked.expect("tracked");
        let events = crate::history::events::EventLog::new(&conn)
            .list_recent(project, 10)
            .expect("events");
        assert_eq!(events[0].id, tracked.event_id);
        assert_eq!(events[0].event_type, EventType::RestoreSnapshot);
        assert_eq!(events[0].changes, json!({ "snapshot_id": snapshot }));
    }
}
