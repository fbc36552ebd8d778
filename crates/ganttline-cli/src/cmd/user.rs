//! `ganttline user`: manage the people tasks are assigned to.

use std::io::Write;

use clap::{Args, Subcommand};

use super::{Session, history_note};
use crate::output::{OutputMode, render_ok};

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    #[command(
        about = "Add a user to a project",
        after_help = "EXAMPLES:\n    ganttline user add 3 Alice --color \"#ff8800\""
    )]
    Add(UserAddArgs),

    #[command(about = "Rename or recolor a user")]
    Update(UserUpdateArgs),

    #[command(about = "Delete a user; their subtasks become unassigned")]
    Delete(UserIdArgs),
}

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Project id.
    pub project: i64,

    pub name: String,

    /// Color tag such as "#ff8800" (defaults to grey).
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug)]
pub struct UserUpdateArgs {
    /// User id.
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug)]
pub struct UserIdArgs {
    /// User id.
    pub id: i64,
}

pub fn run_user(args: &UserArgs, session: &Session, output: OutputMode) -> anyhow::Result<()> {
    let ops = session.ops();
    let (verb, applied) = match &args.command {
        UserCommand::Add(a) => (
            "added",
            ops.add_user(a.project, &a.name, a.color.as_deref())?,
        ),
        UserCommand::Update(a) => (
            "updated",
            ops.update_user(a.id, a.name.as_deref(), a.color.as_deref())?,
        ),
        UserCommand::Delete(a) => ("deleted", ops.delete_user(a.id)?),
    };
    render_ok(output, &applied, |v, w| {
        writeln!(
            w,
            "✓ {verb} user {} '{}'{}",
            v.value.id,
            v.value.name,
            history_note(v.history)
        )
    })
}
