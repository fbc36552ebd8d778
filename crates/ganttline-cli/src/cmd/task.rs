//! `ganttline task`: manage a project's main tasks.

use std::io::Write;

use clap::{Args, Subcommand};

use super::{Session, history_note};
use crate::output::{OutputMode, render_ok};

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    #[command(
        about = "Append a main task to a project",
        after_help = "EXAMPLES:\n    ganttline task add 3 --name Design --offset 5"
    )]
    Add(TaskAddArgs),

    #[command(about = "Rename a main task or move its start")]
    Update(TaskUpdateArgs),

    #[command(about = "Delete a main task and its subtasks")]
    Delete(TaskIdArgs),
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    /// Project id.
    pub project: i64,

    /// Task name (defaults to "Main task").
    #[arg(long)]
    pub name: Option<String>,

    /// Start, in days after the project start.
    #[arg(long, allow_negative_numbers = true, value_name = "DAYS")]
    pub offset: Option<i64>,
}

#[derive(Args, Debug)]
pub struct TaskUpdateArgs {
    /// Main task id.
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, allow_negative_numbers = true, value_name = "DAYS")]
    pub offset: Option<i64>,
}

#[derive(Args, Debug)]
pub struct TaskIdArgs {
    /// Main task id.
    pub id: i64,
}

pub fn run_task(args: &TaskArgs, session: &Session, output: OutputMode) -> anyhow::Result<()> {
    let ops = session.ops();
    let (verb, applied) = match &args.command {
        TaskCommand::Add(a) => ("added", ops.add_main_task(a.project, a.name.as_deref(), a.offset)?),
        TaskCommand::Update(a) => (
            "updated",
            ops.update_main_task(a.id, a.name.as_deref(), a.offset)?,
        ),
        TaskCommand::Delete(a) => ("deleted", ops.delete_main_task(a.id)?),
    };
    render_ok(output, &applied, |v, w| {
        writeln!(
            w,
            "✓ {verb} main task {} '{}'{}",
            v.value.id,
            v.value.name,
            history_note(v.history)
        )
    })
}
