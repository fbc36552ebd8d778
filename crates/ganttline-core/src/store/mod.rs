//! Row-level access to the live entity tables.
//!
//! Every function takes a `&Connection`, so the same calls work on a plain
//! connection and inside a [`rusqlite::Transaction`] (which derefs to one).

pub mod projects;
pub mod subtasks;
pub mod tasks;
pub mod tree;
pub mod users;

pub use projects::{NewProject, ProjectChanges};
pub use subtasks::SubtaskChanges;
pub use tree::load_project_state;
