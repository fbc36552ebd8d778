//! `ganttline subtask`: manage the subtasks under a main task.

use std::io::Write;

use clap::{Args, Subcommand};

use ganttline_core::store::SubtaskChanges;

use super::{Session, history_note};
use crate::output::{OutputMode, render_ok};

#[derive(Args, Debug)]
pub struct SubtaskArgs {
    #[command(subcommand)]
    pub command: SubtaskCommand,
}

#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    #[command(
        about = "Append a subtask to a main task",
        after_help = "EXAMPLES:\n    ganttline subtask add 7 \"Pack boxes\" --user 2 --duration 3"
    )]
    Add(SubtaskAddArgs),

    #[command(
        about = "Change a subtask's name, assignee or duration",
        after_help = "EXAMPLES:\n    ganttline subtask update 12 --duration 5\n\n    ganttline subtask update 12 --unassign"
    )]
    Update(SubtaskUpdateArgs),

    #[command(about = "Delete a subtask; later siblings move up")]
    Delete(SubtaskIdArgs),
}

#[derive(Args, Debug)]
pub struct SubtaskAddArgs {
    /// Main task id.
    pub task: i64,

    pub name: String,

    /// Assignee user id; must belong to the same project.
    #[arg(long, value_name = "ID")]
    pub user: Option<i64>,

    /// Duration in days (defaults to 7, minimum 1).
    #[arg(long, value_name = "DAYS")]
    pub duration: Option<i64>,
}

#[derive(Args, Debug)]
pub struct SubtaskUpdateArgs {
    /// Subtask id.
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, value_name = "ID", conflicts_with = "unassign")]
    pub user: Option<i64>,

    /// Clear the assignee.
    #[arg(long)]
    pub unassign: bool,

    #[arg(long, value_name = "DAYS")]
    pub duration: Option<i64>,
}

impl SubtaskUpdateArgs {
    fn changes(&self) -> SubtaskChanges {
        SubtaskChanges {
            name: self.name.clone(),
            user_id: if self.unassign {
                Some(None)
            } else {
                self.user.map(Some)
            },
            duration_days: self.duration,
        }
    }
}

#[derive(Args, Debug)]
pub struct SubtaskIdArgs {
    /// Subtask id.
    pub id: i64,
}

pub fn run_subtask(
    args: &SubtaskArgs,
    session: &Session,
    output: OutputMode,
) -> anyhow::Result<()> {
    let ops = session.ops();
    let (verb, applied) = match &args.command {
        SubtaskCommand::Add(a) => (
            "added",
            ops.add_subtask(a.task, &a.name, a.user, a.duration)?,
        ),
        SubtaskCommand::Update(a) => ("updated", ops.update_subtask(a.id, &a.changes())?),
        SubtaskCommand::Delete(a) => ("deleted", ops.delete_subtask(a.id)?),
    };
    render_ok(output, &applied, |v, w| {
        writeln!(
            w,
            "✓ {verb} subtask {} '{}'{}",
            v.value.id,
            v.value.name,
            history_note(v.history)
        )
    })
}
