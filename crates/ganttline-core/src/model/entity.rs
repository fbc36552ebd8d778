//! Live entity rows as stored in the relational tables.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default color tag for users created without one.
pub const DEFAULT_USER_COLOR: &str = "#999999";

/// Default duration for new subtasks, in days.
pub const DEFAULT_SUBTASK_DURATION_DAYS: i64 = 7;

/// Default name for projects created with a blank name.
pub const DEFAULT_PROJECT_NAME: &str = "untitled";

/// Default name for main tasks created with a blank name.
pub const DEFAULT_MAIN_TASK_NAME: &str = "Main task";

/// Name given to users restored from a snapshot with a blank name.
pub const DEFAULT_USER_NAME: &str = "Unnamed user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Project {
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MainTask {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub position: i64,
    pub start_offset_days: i64,
}

/// A subtask row. The same shape is embedded in snapshot documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    #[serde(deserialize_with = "super::lenient::int")]
    pub id: i64,
    #[serde(deserialize_with = "super::lenient::int")]
    pub main_task_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "super::lenient::opt_int")]
    pub user_id: Option<i64>,
    #[serde(deserialize_with = "super::lenient::int")]
    pub duration_days: i64,
    #[serde(deserialize_with = "super::lenient::int")]
    pub position: i64,
}
