//! Full project state: the read model that snapshot documents mirror.
//!
//! Order is significant everywhere: users in id order, main tasks in
//! display order, subtasks in position order. Equality is structural, so
//! two states compare equal only if every id and ordering matches.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entity::Subtask;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    pub project: ProjectAttributes,
    #[serde(default)]
    pub users: Vec<UserEntry>,
    #[serde(default)]
    pub main_tasks: Vec<MainTaskEntry>,
}

/// Project columns captured in a snapshot. Password and slug are recorded
/// but never written back on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAttributes {
    #[serde(deserialize_with = "super::lenient::int")]
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default, deserialize_with = "super::lenient::opt_non_empty")]
    pub password: Option<String>,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    #[serde(deserialize_with = "super::lenient::int")]
    pub id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainTaskEntry {
    #[serde(deserialize_with = "super::lenient::int")]
    pub id: i64,
    pub name: String,
    #[serde(deserialize_with = "super::lenient::int")]
    pub position: i64,
    #[serde(default, deserialize_with = "super::lenient::int")]
    pub start_offset_days: i64,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl ProjectState {
    /// A project with no users and no tasks.
    #[must_use]
    pub const fn empty(project: ProjectAttributes) -> Self {
        Self {
            project,
            users: Vec::new(),
            main_tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn subtask_count(&self) -> usize {
        self.main_tasks.iter().map(|t| t.subtasks.len()).sum()
    }
}
