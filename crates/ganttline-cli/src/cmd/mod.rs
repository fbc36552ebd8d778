pub mod history;
pub mod project;
pub mod subtask;
pub mod task;
pub mod user;

use anyhow::Result;
use rusqlite::Connection;

use ganttline_core::config::Config;
use ganttline_core::db;
use ganttline_core::history::SnapshotPolicy;
use ganttline_core::{History, Ops};

/// An open database plus the history settings from config.
pub struct Session {
    pub conn: Connection,
    pub policy: SnapshotPolicy,
    pub page_limit: usize,
}

impl Session {
    /// Open the configured database, creating and migrating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let conn = db::open_db(&config.database.path)?;
        Ok(Self {
            conn,
            policy: config.history.policy(),
            page_limit: config.history.page_limit(),
        })
    }

    pub fn ops(&self) -> Ops<'_> {
        Ops::with_policy(&self.conn, self.policy)
    }

    pub fn history(&self) -> History<'_> {
        History::new(&self.conn)
            .with_policy(self.policy)
            .with_page_limit(self.page_limit)
    }
}

/// Trailing history note for human output, e.g. ` (event 12, snapshot 3)`.
pub fn history_note(outcome: Option<ganttline_core::history::TrackOutcome>) -> String {
    match outcome {
        Some(o) => match o.snapshot_id {
            Some(snapshot) => format!(" (event {}, snapshot {snapshot})", o.event_id),
            None => format!(" (event {})", o.event_id),
        },
        None => String::new(),
    }
}
