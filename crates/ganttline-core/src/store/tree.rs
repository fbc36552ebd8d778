//! Assemble the full [`ProjectState`] of a project from live rows.

use rusqlite::Connection;

use crate::error::Result;
use crate::model::{MainTaskEntry, ProjectAttributes, ProjectState, UserEntry};

use super::{projects, subtasks, tasks, users};

/// Read the project, its users (id order), its main tasks (position, then
/// id) and each task's subtasks (position order).
///
/// Returns `Ok(None)` when the project does not exist.
///
/// # Errors
///
/// Returns [`crate::GanttlineError::Storage`] if any query fails.
pub fn load_project_state(conn: &Connection, project_id: i64) -> Result<Option<ProjectState>> {
    let Some(project) = projects::get_project(conn, project_id)? else {
        return Ok(None);
    };

    let users = users::list_users(conn, project_id)?
        .into_iter()
        .map(|u| UserEntry {
            id: u.id,
            name: u.name,
            color: u.color,
        })
        .collect();

    let mut main_tasks = Vec::new();
    for task in tasks::list_main_tasks(conn, project_id)? {
        main_tasks.push(MainTaskEntry {
            subtasks: subtasks::list_subtasks(conn, task.id)?,
            id: task.id,
            name: task.name,
            position: task.position,
            start_offset_days: task.start_offset_days,
        });
    }

    Ok(Some(ProjectState {
        project: ProjectAttributes {
            id: project.id,
            name: project.name,
            slug: project.slug,
            password: project.password,
            start_date: project.start_date,
        },
        users,
        main_tasks,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::testing::seed_project;

    #[test]
    fn missing_project_yields_none() {
        let conn = db::open_in_memory().expect("db");
        assert!(load_project_state(&conn, 1).expect("load").is_none());
    }

    #[test]
    fn tree_is_ordered() {
        let conn = db::open_in_memory().expect("db");
        let project = seed_project(&conn, "Roadmap");
        let ada = users::insert_user(&conn, project, "Ada", "#f00").expect("ada");
        users::insert_user(&conn, project, "Bob", "#0f0").expect("bob");

        // Inserted out of display order on purpose.
        let late = tasks::insert_main_task_at(&conn, project, "Ship", 4, 10).expect("late");
        let early = tasks::insert_main_task_at(&conn, project, "Plan", 1, 0).expect("early");
        subtasks::insert_subtask(&conn, early.id, "Scope", Some(ada.id), 2).expect("s1");
        subtasks::insert_subtask(&conn, early.id, "Estimate", None, 1).expect("s2");

        let state = load_project_state(&conn, project).expect("load").expect("exists");
        assert_eq!(state.project.name, "Roadmap");
        assert_eq!(
            state.users.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(),
            vec!["Ada", "Bob"]
        );
        assert_eq!(
            state.main_tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![early.id, late.id]
        );
        let names: Vec<_> = state.main_tasks[0]
            .subtasks
            .iter()
            .map(|s| (s.name.as_str(), s.position, s.user_id))
            .collect();
        assert_eq!(names, vec![("Scope", 0, Some(ada.id)), ("Estimate", 1, None)]);
        assert!(state.main_tasks[1].subtasks.is_empty());
        assert_eq!(state.subtask_count(), 2);
    }
}
