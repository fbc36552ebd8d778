//! Mutation handlers.
//!
//! Each handler validates its input, applies the row change through
//! [`crate::store`], then records a change descriptor through the
//! best-effort tracker. The row change is never undone because history
//! could not be written.
//!
//! Diff payloads:
//!
//! | handler            | `changes`                                  |
//! |--------------------|--------------------------------------------|
//! | `create_*`/`add_*` | `{"new": {...}}`                           |
//! | `update_*`         | `{"<field>": {"old": .., "new": ..}, ...}` |
//! | `delete_*`         | `{"old": {...}}`                           |
//!
//! A password change is recorded as `{"password": {"changed": true}}`; the
//! value itself never enters the log.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::{GanttlineError, Result};
use crate::history::{ChangeDescriptor, ChangeTracker, SnapshotPolicy, TrackOutcome};
use crate::model::entity::{
    DEFAULT_MAIN_TASK_NAME, DEFAULT_PROJECT_NAME, DEFAULT_SUBTASK_DURATION_DAYS,
    DEFAULT_USER_COLOR,
};
use crate::model::{EntityType, EventType, MainTask, Project, Subtask, User};
use crate::store::{self, NewProject, ProjectChanges, SubtaskChanges};

/// A handler's result plus what the change log recorded for it.
///
/// `history` is `None` when nothing changed or tracking failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applied<T> {
    #[serde(flatten)]
    pub value: T,
    pub history: Option<TrackOutcome>,
}

impl<T> Applied<T> {
    const fn untracked(value: T) -> Self {
        Self {
            value,
            history: None,
        }
    }
}

/// Record a change, logging and discarding any tracking failure.
pub fn track_best_effort(
    conn: &Connection,
    policy: SnapshotPolicy,
    change: &ChangeDescriptor,
) -> Option<TrackOutcome> {
    ChangeTracker::with_policy(conn, policy).track_best_effort(change)
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`GanttlineError::InvalidInput`] for anything else.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        GanttlineError::InvalidInput(format!("start date must be YYYY-MM-DD, got '{raw}'"))
    })
}

fn required_name(raw: &str, what: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GanttlineError::InvalidInput(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

fn name_or_default(raw: Option<&str>, default: &str) -> String {
    raw.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn record_field<T: Serialize + PartialEq>(diff: &mut Map<String, Value>, field: &str, old: &T, new: &T) {
    if old != new {
        diff.insert(field.to_string(), json!({ "old": old, "new": new }));
    }
}

fn project_json(project: &Project) -> Value {
    json!({
        "id": project.id,
        "name": project.name,
        "slug": project.slug,
        "start_date": project.start_date,
        "has_password": project.has_password(),
    })
}

// ---------------------------------------------------------------------------
// Ops
// ---------------------------------------------------------------------------

/// Mutation handlers bound to one connection and snapshot policy.
pub struct Ops<'conn> {
    conn: &'conn Connection,
    policy: SnapshotPolicy,
}

impl<'conn> Ops<'conn> {
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_policy(conn, SnapshotPolicy::default())
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn with_policy(conn: &'conn Connection, policy: SnapshotPolicy) -> Self {
        Self { conn, policy }
    }

    fn track(
        &self,
        project_id: i64,
        event_type: EventType,
        entity_type: EntityType,
        entity_id: i64,
        changes: Value,
        description: String,
    ) -> Option<TrackOutcome> {
        track_best_effort(
            self.conn,
            self.policy,
            &ChangeDescriptor {
                project_id,
                event_type,
                entity_type,
                entity_id: Some(entity_id),
                changes,
                description: Some(description),
            },
        )
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    /// Create a project. A missing name becomes `untitled`; a missing start
    /// date becomes today (UTC).
    ///
    /// # Errors
    ///
    /// [`GanttlineError::InvalidInput`] for a blank name or malformed date.
    pub fn create_project(
        &self,
        name: Option<&str>,
        start_date: Option<&str>,
        password: Option<&str>,
    ) -> Result<Applied<Project>> {
        let name = match name {
            Some(raw) => required_name(raw, "project")?,
            None => DEFAULT_PROJECT_NAME.to_string(),
        };
        let start_date = match start_date {
            Some(raw) => parse_date(raw)?,
            None => Utc::now().date_naive(),
        };

        let project = store::projects::insert_project(
            self.conn,
            &NewProject {
                name: &name,
                start_date,
                password,
            },
        )?;
        let history = self.track(
            project.id,
            EventType::CreateProject,
            EntityType::Project,
            project.id,
            json!({ "new": project_json(&project) }),
            format!("Created project '{}'", project.name),
        );
        Ok(Applied {
            value: project,
            history,
        })
    }

    /// Update any of name, start date and password.
    ///
    /// `password: Some(None)` or `Some(Some(""))` clears it. Fields equal to
    /// their current value are ignored; if nothing differs no row is written
    /// and nothing is logged.
    ///
    /// # Errors
    ///
    /// [`GanttlineError::ProjectNotFound`] or [`GanttlineError::InvalidInput`].
    pub fn update_project(
        &self,
        id: i64,
        name: Option<&str>,
        start_date: Option<&str>,
        password: Option<Option<&str>>,
    ) -> Result<Applied<Project>> {
        let current = store::projects::require_project(self.conn, id)?;
        let name = name.map(|n| required_name(n, "project")).transpose()?;
        let start_date = start_date.map(parse_date).transpose()?;
        let password = password.map(|p| p.filter(|p| !p.is_empty()).map(String::from));

        let mut diff = Map::new();
        let mut changes = ProjectChanges::default();
        if let Some(name) = name.filter(|n| *n != current.name) {
            record_field(&mut diff, "name", &current.name, &name);
            changes.name = Some(name);
        }
        if let Some(date) = start_date.filter(|d| *d != current.start_date) {
            record_field(&mut diff, "start_date", &current.start_date, &date);
            changes.start_date = Some(date);
        }
        if let Some(password) = password.filter(|p| *p != current.password) {
            diff.insert("password".into(), json!({ "changed": true }));
            changes.password = Some(password);
        }

        if changes.is_empty() {
            return Ok(Applied::untracked(current));
        }
        store::projects::update_project(self.conn, id, &changes)?;
        let updated = store::projects::require_project(self.conn, id)?;
        let history = self.track(
            id,
            EventType::UpdateProject,
            EntityType::Project,
            id,
            Value::Object(diff),
            format!("Updated project '{}'", updated.name),
        );
        Ok(Applied {
            value: updated,
            history,
        })
    }

    /// Delete a project. Its history is deleted with it, so nothing is
    /// logged.
    ///
    /// # Errors
    ///
    /// [`GanttlineError::ProjectNotFound`].
    pub fn delete_project(&self, id: i64) -> Result<Project> {
        let project = store::projects::require_project(self.conn, id)?;
        store::projects::delete_project(self.conn, id)?;
        tracing::info!(project_id = id, "deleted project");
        Ok(project)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// [`GanttlineError::ProjectNotFound`] or [`GanttlineError::InvalidInput`]
    /// for a blank name.
    pub fn add_user(
        &self,
        project_id: i64,
        name: &str,
        color: Option<&str>,
    ) -> Result<Applied<User>> {
        let name = required_name(name, "user")?;
        let color = color.unwrap_or(DEFAULT_USER_COLOR);
        let user = store::users::insert_user(self.conn, project_id, &name, color)?;
        let history = self.track(
            project_id,
            EventType::AddUser,
            EntityType::User,
            user.id,
            json!({ "new": { "id": user.id, "name": user.name, "color": user.color } }),
            format!("Added user '{}'", user.name),
        );
        Ok(Applied {
            value: user,
            history,
        })
    }

    /// # Errors
    ///
    /// [`GanttlineError::UserNotFound`] or [`GanttlineError::InvalidInput`].
    pub fn update_user(
        &self,
        id: i64,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Applied<User>> {
        let current = store::users::require_user(self.conn, id)?;
        let name = name
            .map(|n| required_name(n, "user"))
            .transpose()?
            .filter(|n| *n != current.name);
        let color = color.filter(|c| *c != current.color);

        if name.is_none() && color.is_none() {
            return Ok(Applied::untracked(current));
        }
        let mut diff = Map::new();
        if let Some(ref name) = name {
            record_field(&mut diff, "name", &current.name, name);
        }
        if let Some(color) = color {
            record_field(&mut diff, "color", &current.color.as_str(), &color);
        }
        store::users::update_user(self.conn, id, name.as_deref(), color)?;
        let updated = store::users::require_user(self.conn, id)?;
        let history = self.track(
            updated.project_id,
            EventType::UpdateUser,
            EntityType::User,
            id,
            Value::Object(diff),
            format!("Updated user '{}'", updated.name),
        );
        Ok(Applied {
            value: updated,
            history,
        })
    }

    /// Delete a user; its subtasks become unassigned.
    ///
    /// # Errors
    ///
    /// [`GanttlineError::UserNotFound`].
    pub fn delete_user(&self, id: i64) -> Result<Applied<User>> {
        let user = store::users::require_user(self.conn, id)?;
        store::users::delete_user(self.conn, id)?;
        let history = self.track(
            user.project_id,
            EventType::DeleteUser,
            EntityType::User,
            id,
            json!({ "old": { "id": user.id, "name": user.name, "color": user.color } }),
            format!("Deleted user '{}'", user.name),
        );
        Ok(Applied {
            value: user,
            history,
        })
    }

    // -----------------------------------------------------------------------
    // Main tasks
    // -----------------------------------------------------------------------

    /// Append a main task. A blank name becomes `Main task`.
    ///
    /// # Errors
    ///
    /// [`GanttlineError::ProjectNotFound`].
    pub fn add_main_task(
        &self,
        project_id: i64,
        name: Option<&str>,
        start_offset_days: Option<i64>,
    ) -> Result<Applied<MainTask>> {
        let name = name_or_default(name, DEFAULT_MAIN_TASK_NAME);
        let task = store::tasks::insert_main_task(
            self.conn,
            project_id,
            &name,
            start_offset_days.unwrap_or(0),
        )?;
        let history = self.track(
            project_id,
            EventType::AddMainTask,
            EntityType::MainTask,
            task.id,
            json!({ "new": task }),
            format!("Added main task '{}'", task.name),
        );
        Ok(Applied {
            value: task,
            history,
        })
    }

    /// # Errors
    ///
    /// [`GanttlineError::MainTaskNotFound`].
    pub fn update_main_task(
        &self,
        id: i64,
        name: Option<&str>,
        start_offset_days: Option<i64>,
    ) -> Result<Applied<MainTask>> {
        let current = store::tasks::require_main_task(self.conn, id)?;
        let name = name
            .map(|n| name_or_default(Some(n), DEFAULT_MAIN_TASK_NAME))
            .filter(|n| *n != current.name);
        let offset = start_offset_days.filter(|o| *o != current.start_offset_days);

        if name.is_none() && offset.is_none() {
            return Ok(Applied::untracked(current));
        }
        let mut diff = Map::new();
        if let Some(ref name) = name {
            record_field(&mut diff, "name", &current.name, name);
        }
        if let Some(offset) = offset {
            record_field(&mut diff, "start_offset_days", &current.start_offset_days, &offset);
        }
        store::tasks::update_main_task(self.conn, id, name.as_deref(), offset)?;
        let updated = store::tasks::require_main_task(self.conn, id)?;
        let history = self.track(
            updated.project_id,
            EventType::UpdateMainTask,
            EntityType::MainTask,
            id,
            Value::Object(diff),
            format!("Updated main task '{}'", updated.name),
        );
        Ok(Applied {
            value: updated,
            history,
        })
    }

    /// Delete a main task with all of its subtasks.
    ///
    /// # Errors
    ///
    /// [`GanttlineError::MainTaskNotFound`].
    pub fn delete_main_task(&self, id: i64) -> Result<Applied<MainTask>> {
        let task = store::tasks::require_main_task(self.conn, id)?;
        let subtasks = store::subtasks::list_subtasks(self.conn, id)?;
        store::tasks::delete_main_task(self.conn, id)?;
        let history = self.track(
            task.project_id,
            EventType::DeleteMainTask,
            EntityType::MainTask,
            id,
            json!({ "old": { "task": task, "subtasks": subtasks } }),
            format!("Deleted main task '{}'", task.name),
        );
        Ok(Applied {
            value: task,
            history,
        })
    }

    // -----------------------------------------------------------------------
    // Subtasks
    // -----------------------------------------------------------------------

    fn check_assignee(&self, task: &MainTask, user_id: Option<i64>) -> Result<()> {
        let Some(user_id) = user_id else {
            return Ok(());
        };
        let user = store::users::require_user(self.conn, user_id)?;
        if user.project_id != task.project_id {
            return Err(GanttlineError::InvalidInput(format!(
                "user {user_id} belongs to project {}, not {}",
                user.project_id, task.project_id
            )));
        }
        Ok(())
    }

    /// Append a subtask. Duration defaults to 7 days and is clamped to at
    /// least 1.
    ///
    /// # Errors
    ///
    /// [`GanttlineError::MainTaskNotFound`], [`GanttlineError::UserNotFound`],
    /// or [`GanttlineError::InvalidInput`] if the user is from another project.
    pub fn add_subtask(
        &self,
        main_task_id: i64,
        name: &str,
        user_id: Option<i64>,
        duration_days: Option<i64>,
    ) -> Result<Applied<Subtask>> {
        let task = store::tasks::require_main_task(self.conn, main_task_id)?;
        self.check_assignee(&task, user_id)?;
        let subtask = store::subtasks::insert_subtask(
            self.conn,
            main_task_id,
            name.trim(),
            user_id,
            duration_days.unwrap_or(DEFAULT_SUBTASK_DURATION_DAYS),
        )?;
        let history = self.track(
            task.project_id,
            EventType::AddSubtask,
            EntityType::Subtask,
            subtask.id,
            json!({ "new": subtask }),
            format!("Added subtask '{}'", subtask.name),
        );
        Ok(Applied {
            value: subtask,
            history,
        })
    }

    /// Apply the fields of `changes` that differ from the stored row.
    ///
    /// # Errors
    ///
    /// [`GanttlineError::SubtaskNotFound`], [`GanttlineError::UserNotFound`],
    /// or [`GanttlineError::InvalidInput`].
    pub fn update_subtask(&self, id: i64, changes: &SubtaskChanges) -> Result<Applied<Subtask>> {
        let current = store::subtasks::require_subtask(self.conn, id)?;
        let task = store::tasks::require_main_task(self.conn, current.main_task_id)?;

        let effective = SubtaskChanges {
            name: changes
                .name
                .as_deref()
                .map(|n| n.trim().to_string())
                .filter(|n| *n != current.name),
            user_id: changes.user_id.filter(|u| *u != current.user_id),
            duration_days: changes
                .duration_days
                .map(store::subtasks::clamp_duration)
                .filter(|d| *d != current.duration_days),
        };
        if effective.is_empty() {
            return Ok(Applied::untracked(current));
        }
        if let Some(user_id) = effective.user_id {
            self.check_assignee(&task, user_id)?;
        }

        let mut diff = Map::new();
        if let Some(ref name) = effective.name {
            record_field(&mut diff, "name", &current.name, name);
        }
        if let Some(user_id) = effective.user_id {
            record_field(&mut diff, "user_id", &current.user_id, &user_id);
        }
        if let Some(days) = effective.duration_days {
            record_field(&mut diff, "duration_days", &current.duration_days, &days);
        }
        store::subtasks::update_subtask(self.conn, id, &effective)?;
        let updated = store::subtasks::require_subtask(self.conn, id)?;
        let history = self.track(
            task.project_id,
            EventType::UpdateSubtask,
            EntityType::Subtask,
            id,
            Value::Object(diff),
            format!("Updated subtask '{}'", updated.name),
        );
        Ok(Applied {
            value: updated,
            history,
        })
    }

    /// Delete a subtask and renumber its later siblings.
    ///
    /// # Errors
    ///
    /// [`GanttlineError::SubtaskNotFound`].
    pub fn delete_subtask(&self, id: i64) -> Result<Applied<Subtask>> {
        let current = store::subtasks::require_subtask(self.conn, id)?;
        let task = store::tasks::require_main_task(self.conn, current.main_task_id)?;
        let removed = store::subtasks::delete_subtask(self.conn, id)?;
        let history = self.track(
            task.project_id,
            EventType::DeleteSubtask,
            EntityType::Subtask,
            id,
            json!({ "old": removed }),
            format!("Deleted subtask '{}'", removed.name),
        );
        Ok(Applied {
            value: removed,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::history::EventLog;

    fn events(conn: &Connection, project_id: i64) -> Vec<(EventType, Value)> {
        EventLog::new(conn)
            .list_recent(project_id, 100)
            .expect("events")
            .into_iter()
            .rev()
            .map(|e| (e.event_type, e.changes))
            .collect()
    }

    #[test]
    fn create_project_defaults_and_tracks() {
        let conn = db::open_in_memory().expect("db");
        let ops = Ops::new(&conn);
        let created = ops.create_project(None, None, None).expect("create");
        assert_eq!(created.value.name, "untitled");
        assert_eq!(created.value.start_date, Utc::now().date_naive());
        let history = created.history.expect("tracked");
        assert!(history.snapshot_id.is_some());

        let log = events(&conn, created.value.id);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, EventType::CreateProject);
        assert_eq!(log[0].1["new"]["slug"], json!("untitled"));
    }

    #[test]
    fn create_project_validates_input() {
        let conn = db::open_in_memory().expect("db");
        let ops = Ops::new(&conn);
        assert!(matches!(
            ops.create_project(Some("   "), None, None).unwrap_err(),
            GanttlineError::InvalidInput(_)
        ));
        assert!(matches!(
            ops.create_project(Some("Plan"), Some("03/01/2024"), None).unwrap_err(),
            GanttlineError::InvalidInput(_)
        ));
    }

    #[test]
    fn update_project_diffs_only_changed_fields() {
        let conn = db::open_in_memory().expect("db");
        let ops = Ops::new(&conn);
        let project = ops
            .create_project(Some("Plan"), Some("2024-03-01"), None)
            .expect("create")
            .value;

        let updated = ops
            .update_project(project.id, Some("Plan"), Some("2024-04-01"), Some(Some("pw")))
            .expect("update");
        assert!(updated.history.is_some());
        assert!(updated.value.has_password());

        let log = events(&conn, project.id);
        let (event_type, diff) = &log[1];
        assert_eq!(*event_type, EventType::UpdateProject);
        assert_eq!(
            *diff,
            json!({
                "start_date": {"old": "2024-03-01", "new": "2024-04-01"},
                "password": {"changed": true},
            })
        );
    }

    #[test]
    fn no_op_update_records_nothing() {
        let conn = db::open_in_memory().expect("db");
        let ops = Ops::new(&conn);
        let project = ops
            .create_project(Some("Plan"), Some("2024-03-01"), None)
            .expect("create")
            .value;
        let user = ops.add_user(project.id, "Ada", None).expect("user").value;
        assert_eq!(user.color, DEFAULT_USER_COLOR);

        let same = ops
            .update_project(project.id, Some(" Plan "), Some("2024-03-01"), Some(None))
            .expect("update");
        assert!(same.history.is_none());
        let same_user = ops.update_user(user.id, Some("Ada"), None).expect("update user");
        assert!(same_user.history.is_none());
        assert_eq!(events(&conn, project.id).len(), 2);
    }

    #[test]
    fn subtask_lifecycle_is_logged() {
        let conn = db::open_in_memory().expect("db");
        let ops = Ops::new(&conn);
        let project = ops.create_project(Some("Plan"), None, None).expect("p").value;
        let user = ops.add_user(project.id, "Ada", Some("#f00")).expect("u").value;
        let task = ops.add_main_task(project.id, Some(""), None).expect("t").value;
        assert_eq!(task.name, DEFAULT_MAIN_TASK_NAME);

        let sub = ops.add_subtask(task.id, "Wire", None, None).expect("s").value;
        assert_eq!(sub.duration_days, DEFAULT_SUBTASK_DURATION_DAYS);
        ops.update_subtask(
            sub.id,
            &SubtaskChanges {
                user_id: Some(Some(user.id)),
                duration_days: Some(0),
                ..SubtaskChanges::default()
            },
        )
        .expect("update");
        ops.delete_subtask(sub.id).expect("delete");

        let log = events(&conn, project.id);
        let kinds: Vec<EventType> = log.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                EventType::CreateProject,
                EventType::AddUser,
                EventType::AddMainTask,
                EventType::AddSubtask,
                EventType::UpdateSubtask,
                EventType::DeleteSubtask,
            ]
        );
        assert_eq!(
            log[4].1,
            json!({
                "user_id": {"old": null, "new": user.id},
                "duration_days": {"old": 7, "new": 1},
            })
        );
        assert_eq!(log[5].1["old"]["name"], json!("Wire"));
    }

    #[test]
    fn assignee_must_share_the_project() {
        let conn = db::open_in_memory().expect("db");
        let ops = Ops::new(&conn);
        let a = ops.create_project(Some("A"), None, None).expect("a").value;
        let b = ops.create_project(Some("B"), None, None).expect("b").value;
        let stranger = ops.add_user(b.id, "Eve", None).expect("eve").value;
        let task = ops.add_main_task(a.id, None, None).expect("task").value;

        let err = ops
            .add_subtask(task.id, "Wire", Some(stranger.id), None)
            .unwrap_err();
        assert!(matches!(err, GanttlineError::InvalidInput(_)));
        assert!(matches!(
            ops.add_subtask(task.id, "Wire", Some(9_999), None).unwrap_err(),
            GanttlineError::UserNotFound(9_999)
        ));
    }

    #[test]
    fn delete_project_takes_history_with_it() {
        let conn = db::open_in_memory().expect("db");
        let ops = Ops::new(&conn);
        let project = ops.create_project(Some("Gone"), None, None).expect("p").value;
        ops.add_user(project.id, "Ada", None).expect("u");
        ops.delete_project(project.id).expect("delete");
        assert!(events(&conn, project.id).is_empty());
        let snapshots: i64 = conn
            .query_row("SELECT COUNT(*) FROM project_snapshots", [], |row| row.get(0))
            .expect("count");
        assert_eq!(snapshots, 0);
    }
}
