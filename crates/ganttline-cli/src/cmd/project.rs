//! `ganttline project`: create, inspect, edit and delete projects.

use std::io::Write;

use clap::{Args, Subcommand};
use serde::Serialize;

use ganttline_core::model::{MainTask, Project, Subtask, User};
use ganttline_core::store;

use super::{Session, history_note};
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_ok};

// ---------------------------------------------------------------------------
// Clap types
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    #[command(
        about = "Create a project",
        after_help = "EXAMPLES:\n    ganttline project create \"Office move\" --start 2024-03-01"
    )]
    Create(CreateArgs),

    #[command(about = "List projects, newest first")]
    List,

    #[command(about = "Show a project with its users and tasks")]
    Show(ShowArgs),

    #[command(
        about = "Change a project's name, start date or password",
        after_help = "EXAMPLES:\n    ganttline project update 3 --name \"Office move v2\"\n\n    ganttline project update 3 --clear-password"
    )]
    Update(UpdateArgs),

    #[command(about = "Delete a project and everything in it, history included")]
    Delete(ShowArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Project name (defaults to "untitled").
    pub name: Option<String>,

    /// Start date, YYYY-MM-DD (defaults to today, UTC).
    #[arg(long, value_name = "DATE")]
    pub start: Option<String>,

    /// Optional edit password.
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Project id.
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Project id.
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    /// New start date, YYYY-MM-DD.
    #[arg(long, value_name = "DATE")]
    pub start: Option<String>,

    #[arg(long, conflicts_with = "clear_password")]
    pub password: Option<String>,

    /// Remove the password.
    #[arg(long)]
    pub clear_password: bool,
}

impl UpdateArgs {
    fn password_change(&self) -> Option<Option<&str>> {
        if self.clear_password {
            Some(None)
        } else {
            self.password.as_deref().map(Some)
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ProjectView {
    project: Project,
    users: Vec<User>,
    main_tasks: Vec<MainTaskView>,
}

#[derive(Debug, Serialize)]
struct MainTaskView {
    #[serde(flatten)]
    task: MainTask,
    subtasks: Vec<Subtask>,
}

fn load_view(session: &Session, id: i64) -> anyhow::Result<ProjectView> {
    let conn = &session.conn;
    let project = store::projects::require_project(conn, id)?;
    let users = store::users::list_users(conn, id)?;
    let main_tasks = store::tasks::list_main_tasks(conn, id)?
        .into_iter()
        .map(|task| {
            let subtasks = store::subtasks::list_subtasks(conn, task.id)?;
            Ok(MainTaskView { task, subtasks })
        })
        .collect::<ganttline_core::Result<Vec<_>>>()?;
    Ok(ProjectView {
        project,
        users,
        main_tasks,
    })
}

fn write_project(w: &mut dyn Write, p: &Project) -> std::io::Result<()> {
    pretty_kv(w, "id", p.id.to_string())?;
    pretty_kv(w, "name", &p.name)?;
    pretty_kv(w, "slug", &p.slug)?;
    pretty_kv(w, "start", p.start_date.to_string())?;
    pretty_kv(w, "password", if p.has_password() { "set" } else { "none" })
}

fn write_view(w: &mut dyn Write, view: &ProjectView) -> std::io::Result<()> {
    write_project(w, &view.project)?;
    writeln!(w)?;
    pretty_section(w, &format!("Users ({})", view.users.len()))?;
    for u in &view.users {
        writeln!(w, "#{:<5} {:<24} {}", u.id, u.name, u.color)?;
    }
    writeln!(w)?;
    pretty_section(w, &format!("Main tasks ({})", view.main_tasks.len()))?;
    for mt in &view.main_tasks {
        writeln!(
            w,
            "#{:<5} {} (day +{})",
            mt.task.id, mt.task.name, mt.task.start_offset_days
        )?;
        for st in &mt.subtasks {
            let who = st
                .user_id
                .and_then(|id| view.users.iter().find(|u| u.id == id))
                .map_or("-", |u| u.name.as_str());
            writeln!(
                w,
                "    #{:<5} {:<24} {:>3}d  {who}",
                st.id, st.name, st.duration_days
            )?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub fn run_project(args: &ProjectArgs, session: &Session, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        ProjectCommand::Create(a) => {
            let applied = session.ops().create_project(
                a.name.as_deref(),
                a.start.as_deref(),
                a.password.as_deref(),
            )?;
            render_ok(output, &applied, |v, w| {
                writeln!(
                    w,
                    "✓ created project {} '{}'{}",
                    v.value.id,
                    v.value.name,
                    history_note(v.history)
                )
            })
        }
        ProjectCommand::List => {
            let projects = store::projects::list_projects(&session.conn)?;
            render(output, &projects, |list, w| {
                if list.is_empty() {
                    return writeln!(w, "no projects");
                }
                for p in list {
                    writeln!(w, "#{:<5} {:<32} {}  {}", p.id, p.name, p.start_date, p.slug)?;
                }
                Ok(())
            })
        }
        ProjectCommand::Show(a) => {
            let view = load_view(session, a.id)?;
            render(output, &view, |v, w| write_view(w, v))
        }
        ProjectCommand::Update(a) => {
            let applied = session.ops().update_project(
                a.id,
                a.name.as_deref(),
                a.start.as_deref(),
                a.password_change(),
            )?;
            render_ok(output, &applied, |v, w| {
                writeln!(w, "✓ updated project {}{}", v.value.id, history_note(v.history))
            })
        }
        ProjectCommand::Delete(a) => {
            let project = session.ops().delete_project(a.id)?;
            render_ok(output, &project, |p, w| {
                writeln!(w, "✓ deleted project {} '{}'", p.id, p.name)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(password: Option<&str>, clear: bool) -> UpdateArgs {
        UpdateArgs {
            id: 1,
            name: None,
            start: None,
            password: password.map(str::to_string),
            clear_password: clear,
        }
    }

    #[test]
    fn password_change_variants() {
        assert_eq!(update(None, false).password_change(), None);
        assert_eq!(update(Some("pw"), false).password_change(), Some(Some("pw")));
        assert_eq!(update(None, true).password_change(), Some(None));
    }
}
