//! Event and entity type tags recorded in the change log.
//!
//! Tags are stored as snake_case strings (`add_subtask`, `main_task`) so the
//! log stays readable from plain SQL.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mutations recorded in the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    CreateProject,
    UpdateProject,
    AddUser,
    UpdateUser,
    DeleteUser,
    AddMainTask,
    UpdateMainTask,
    DeleteMainTask,
    AddSubtask,
    UpdateSubtask,
    DeleteSubtask,
    /// The live tree was replaced by a snapshot's contents.
    RestoreSnapshot,
}

/// Error returned when parsing an unknown tag string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag {
    pub kind: &'static str,
    pub raw: String,
}

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.raw)
    }
}

impl std::error::Error for UnknownTag {}

impl EventType {
    pub const ALL: [Self; 12] = [
        Self::CreateProject,
        Self::UpdateProject,
        Self::AddUser,
        Self::UpdateUser,
        Self::DeleteUser,
        Self::AddMainTask,
        Self::UpdateMainTask,
        Self::DeleteMainTask,
        Self::AddSubtask,
        Self::UpdateSubtask,
        Self::DeleteSubtask,
        Self::RestoreSnapshot,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateProject => "create_project",
            Self::UpdateProject => "update_project",
            Self::AddUser => "add_user",
            Self::UpdateUser => "update_user",
            Self::DeleteUser => "delete_user",
            Self::AddMainTask => "add_main_task",
            Self::UpdateMainTask => "update_main_task",
            Self::DeleteMainTask => "delete_main_task",
            Self::AddSubtask => "add_subtask",
            Self::UpdateSubtask => "update_subtask",
            Self::DeleteSubtask => "delete_subtask",
            Self::RestoreSnapshot => "restore_snapshot",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|et| et.as_str() == s)
            .ok_or_else(|| UnknownTag {
                kind: "event type",
                raw: s.to_string(),
            })
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The entity table an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    User,
    MainTask,
    Subtask,
}

impl EntityType {
    pub const ALL: [Self; 4] = [Self::Project, Self::User, Self::MainTask, Self::Subtask];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
            Self::MainTask => "main_task",
            Self::Subtask => "subtask",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|et| et.as_str() == s)
            .ok_or_else(|| UnknownTag {
                kind: "entity type",
                raw: s.to_string(),
            })
    }
}
