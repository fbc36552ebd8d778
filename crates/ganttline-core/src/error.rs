use std::fmt;

use crate::history::codec::DecodeError;

/// Machine-readable error codes for scripting against the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ProjectNotFound,
    UserNotFound,
    MainTaskNotFound,
    SubtaskNotFound,
    SnapshotNotFound,
    InvalidInput,
    CorruptSnapshot,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::ProjectNotFound => "E2001",
            Self::UserNotFound => "E2002",
            Self::MainTaskNotFound => "E2003",
            Self::SubtaskNotFound => "E2004",
            Self::SnapshotNotFound => "E2005",
            Self::InvalidInput => "E2006",
            Self::CorruptSnapshot => "E3003",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ProjectNotFound => "Project not found",
            Self::UserNotFound => "User not found",
            Self::MainTaskNotFound => "Main task not found",
            Self::SubtaskNotFound => "Subtask not found",
            Self::SnapshotNotFound => "Snapshot not found",
            Self::InvalidInput => "Invalid input",
            Self::CorruptSnapshot => "Corrupt snapshot document",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in ganttline.toml and retry."),
            Self::ProjectNotFound => Some("Run `ganttline project list` to see existing projects."),
            Self::UserNotFound | Self::MainTaskNotFound | Self::SubtaskNotFound => {
                Some("Run `ganttline project show <id>` to see current ids.")
            }
            Self::SnapshotNotFound => {
                Some("Run `ganttline history list <project>` to see available snapshots.")
            }
            Self::InvalidInput => None,
            Self::CorruptSnapshot => Some("Pick an older snapshot; this document cannot be decoded."),
            Self::StorageFailure => Some("Check disk space and database file permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the entity store and the history engine.
#[derive(Debug, thiserror::Error)]
pub enum GanttlineError {
    #[error("project {0} not found")]
    ProjectNotFound(i64),

    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("main task {0} not found")]
    MainTaskNotFound(i64),

    #[error("subtask {0} not found")]
    SubtaskNotFound(i64),

    #[error("snapshot {0} not found")]
    SnapshotNotFound(i64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The stored document could not be decoded.
    #[error("snapshot {snapshot_id} is corrupt: {source}")]
    CorruptSnapshot {
        snapshot_id: i64,
        #[source]
        source: DecodeError,
    },

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl GanttlineError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ProjectNotFound(_) => ErrorCode::ProjectNotFound,
            Self::UserNotFound(_) => ErrorCode::UserNotFound,
            Self::MainTaskNotFound(_) => ErrorCode::MainTaskNotFound,
            Self::SubtaskNotFound(_) => ErrorCode::SubtaskNotFound,
            Self::SnapshotNotFound(_) => ErrorCode::SnapshotNotFound,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::CorruptSnapshot { .. } => ErrorCode::CorruptSnapshot,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Remediation text for CLI output; falls back to the code summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.error_code();
        code.hint().unwrap_or_else(|| code.message()).to_string()
    }
}

pub type Result<T, E = GanttlineError> = std::result::Result<T, E>;
