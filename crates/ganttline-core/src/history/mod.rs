//! Change history: an append-only event log paired with periodic full
//! snapshots, and point-in-time restore from those snapshots.
//!
//! - [`codec`] turns a [`ProjectState`](crate::model::ProjectState) into a
//!   versioned JSON document and back
//! - [`events`] is the change log
//! - [`snapshots`] stores the documents
//! - [`tracker`] decides when to snapshot and records every change
//! - [`restore`] rebuilds the live tree from a snapshot
//!
//! [`History`] is the read/restore surface used by the CLI.

pub mod codec;
pub mod events;
pub mod restore;
pub mod snapshots;
pub mod tracker;

use rusqlite::Connection;
use serde::Serialize;

pub use events::{EventLog, HistoryEvent, MAX_PAGE_LIMIT};
pub use restore::{RestoreEngine, RestoreOutcome};
pub use snapshots::{SnapshotMeta, SnapshotStore};
pub use tracker::{ChangeDescriptor, ChangeTracker, SnapshotPolicy, TrackOutcome};

use crate::error::Result;

/// Snapshots and events of one project, each newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub snapshots: Vec<SnapshotMeta>,
    pub events: Vec<HistoryEvent>,
}

pub struct History<'conn> {
    conn: &'conn Connection,
    policy: SnapshotPolicy,
    page_limit: usize,
}

impl<'conn> History<'conn> {
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            policy: SnapshotPolicy::default(),
            page_limit: MAX_PAGE_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Page size for [`get`](Self::get); clamped to [`MAX_PAGE_LIMIT`].
    #[must_use]
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = events::clamp_limit(limit);
        self
    }

    /// Recent snapshots and events. Unknown projects yield empty lists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GanttlineError::Storage`] if either query fails.
    pub fn get(&self, project_id: i64) -> Result<HistoryView> {
        Ok(HistoryView {
            snapshots: SnapshotStore::new(self.conn).list_recent(project_id, self.page_limit)?,
            events: EventLog::new(self.conn).list_recent(project_id, self.page_limit)?,
        })
    }

    /// Restore a snapshot; see [`RestoreEngine::restore`].
    ///
    /// # Errors
    ///
    /// As [`RestoreEngine::restore`].
    pub fn restore(&self, snapshot_id: i64) -> Result<RestoreOutcome> {
        RestoreEngine::with_policy(self.conn, self.policy).restore(snapshot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::testing::seed_project;
    use serde_json::json;

    #[test]
    fn unknown_project_has_empty_history() {
        let conn = db::open_in_memory().expect("db");
        let view = History::new(&conn).get(31).expect("get");
        assert!(view.snapshots.is_empty());
        assert!(view.events.is_empty());
    }

    #[test]
    fn view_respects_page_limit() {
        let conn = db::open_in_memory().expect("db");
        let project = seed_project(&conn, "Roadmap");
        let tracker = ChangeTracker::new(&conn);
        for n in 0..5 {
            tracker
                .track_change(&ChangeDescriptor {
                    project_id: project,
                    event_type: crate::model::EventType::AddUser,
                    entity_type: crate::model::EntityType::User,
                    entity_id: Some(n),
                    changes: json!({"new": {"id": n}}),
                    description: None,
                })
                .expect("track");
        }

        let view = History::new(&conn).with_page_limit(3).get(project).expect("get");
        assert_eq!(view.events.len(), 3);
        assert_eq!(view.snapshots.len(), 1);
        assert_eq!(view.events[0].entity_id, Some(4));
    }
}
