//! `ganttline history`: browse a project's change log and restore snapshots.
//!
//! - `ganttline history list <project>` shows recent snapshots and events
//! - `ganttline history restore <snapshot>` rewinds the project's tasks and
//!   users to that snapshot

use std::io::Write;

use clap::{Args, Subcommand};

use ganttline_core::HistoryView;
use ganttline_core::history::events::clamp_limit;

use super::{Session, history_note};
use crate::output::{OutputMode, pretty_section, render, render_ok};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    #[command(
        about = "Show recent snapshots and events, newest first",
        after_help = "EXAMPLES:\n    ganttline history list 3 --limit 20\n\n    ganttline history list 3 --json"
    )]
    List(HistoryListArgs),

    #[command(
        about = "Restore a project to a snapshot",
        long_about = "Restore a project to a snapshot.\n\n\
            Users, main tasks and subtasks are replaced by the snapshot's contents \
            and get fresh ids. The project name and start date are restored; the \
            slug and password are kept. The restore itself is recorded as an event.",
        after_help = "EXAMPLES:\n    ganttline history restore 12"
    )]
    Restore(HistoryRestoreArgs),
}

#[derive(Args, Debug)]
pub struct HistoryListArgs {
    /// Project id.
    pub project: i64,

    /// Maximum rows per list (1..=100; defaults to history.page_limit).
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct HistoryRestoreArgs {
    /// Snapshot id.
    pub snapshot: i64,
}

fn write_view(w: &mut dyn Write, view: &HistoryView) -> std::io::Result<()> {
    pretty_section(w, &format!("Snapshots ({})", view.snapshots.len()))?;
    for s in &view.snapshots {
        writeln!(
            w,
            "#{:<6} {}  {}",
            s.id,
            s.created_at.format("%Y-%m-%d %H:%M:%S"),
            s.description.as_deref().unwrap_or("")
        )?;
    }
    writeln!(w)?;
    pretty_section(w, &format!("Events ({})", view.events.len()))?;
    for e in &view.events {
        let entity = e
            .entity_id
            .map_or_else(|| e.entity_type.to_string(), |id| format!("{} {id}", e.entity_type));
        let tag = e
            .snapshot_id
            .map_or_else(String::new, |id| format!("  [snapshot {id}]"));
        writeln!(
            w,
            "#{:<6} {}  {:<18} {entity}{tag}",
            e.id,
            e.created_at.format("%Y-%m-%d %H:%M:%S"),
            e.event_type.as_str()
        )?;
    }
    Ok(())
}

pub fn run_history(args: &HistoryArgs, session: &Session, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        HistoryCommand::List(a) => {
            let limit = a.limit.map_or(session.page_limit, clamp_limit);
            let view = session.history().with_page_limit(limit).get(a.project)?;
            render(output, &view, |v, w| write_view(w, v))
        }
        HistoryCommand::Restore(a) => {
            let outcome = session.history().restore(a.snapshot)?;
            render_ok(output, &outcome, |o, w| {
                writeln!(
                    w,
                    "✓ restored project {} to snapshot {}: {} users, {} main tasks, {} subtasks{}",
                    o.project_id,
                    o.snapshot_id,
                    o.users,
                    o.main_tasks,
                    o.subtasks,
                    history_note(o.tracked)
                )
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ganttline_core::db;
    use ganttline_core::history::SnapshotStore;
    use ganttline_core::store::{self, NewProject};

    #[test]
    fn human_view_lists_both_sections() {
        let conn = db::open_in_memory().expect("db");
        let project = store::projects::insert_project(
            &conn,
            &NewProject {
                name: "Move",
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).expect("date"),
                password: None,
            },
        )
        .expect("project");
        SnapshotStore::new(&conn)
            .create(project.id, Some("checkpoint"))
            .expect("snapshot");
        let view = ganttline_core::History::new(&conn).get(project.id).expect("view");

        let mut buf = Vec::new();
        write_view(&mut buf, &view).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("Snapshots (1)\n"));
        assert!(text.contains("checkpoint"));
        assert!(text.contains("Events (0)"));
    }
}
