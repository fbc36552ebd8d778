//! Snapshot policy and change tracking.
//!
//! Every mutation is recorded by [`ChangeTracker::track_change`]. Before the
//! event row is written the tracker decides whether the project's history
//! needs a fresh full snapshot:
//!
//! 1. no snapshot exists for the project yet, or
//! 2. at least [`SnapshotPolicy::event_threshold`] events were logged since
//!    the latest snapshot, or
//! 3. the latest snapshot is older than [`SnapshotPolicy::max_age`].
//!
//! "Since the latest snapshot" means events with a null snapshot reference
//! or a reference above the latest snapshot id. Untagged events from older
//! epochs still match: once a project has accumulated `event_threshold`
//! untagged events, every later change takes a snapshot.
//!
//! The count-then-act sequence holds no lock. Two concurrent trackers may
//! both take a snapshot or both skip one; either is harmless.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use super::events::{EventLog, NewEvent};
use super::snapshots::SnapshotStore;
use crate::error::Result;
use crate::model::{EntityType, EventType};

/// Default number of events after which a snapshot is taken.
pub const DEFAULT_EVENT_THRESHOLD: u64 = 10;

/// Default maximum snapshot age, in seconds.
pub const DEFAULT_MAX_AGE_SECS: i64 = 3600;

/// When to pay for a full snapshot instead of relying on the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    pub event_threshold: u64,
    pub max_age: Duration,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            event_threshold: DEFAULT_EVENT_THRESHOLD,
            max_age: Duration::seconds(DEFAULT_MAX_AGE_SECS),
        }
    }
}

impl SnapshotPolicy {
    /// Decide whether the next event should be preceded by a snapshot.
    ///
    /// A `max_age` reaching past the earliest representable time never
    /// makes a snapshot stale.
    #[must_use]
    pub fn should_snapshot(
        &self,
        latest_snapshot_at: Option<DateTime<Utc>>,
        events_since_last_snapshot: u64,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(latest) = latest_snapshot_at else {
            return true;
        };
        events_since_last_snapshot >= self.event_threshold
            || now
                .checked_sub_signed(self.max_age)
                .is_some_and(|cutoff| latest < cutoff)
    }
}

/// What a mutation handler reports about one change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeDescriptor {
    pub project_id: i64,
    pub event_type: EventType,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    /// Structured diff stored verbatim in the event row.
    pub changes: Value,
    /// Human-readable summary, stored as the description of any snapshot
    /// taken for this change.
    pub description: Option<String>,
}

/// Result of a successful [`ChangeTracker::track_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackOutcome {
    pub event_id: i64,
    /// Snapshot taken for this event, if the policy fired.
    pub snapshot_id: Option<i64>,
}

pub struct ChangeTracker<'conn> {
    conn: &'conn Connection,
    policy: SnapshotPolicy,
}

impl<'conn> ChangeTracker<'conn> {
    /// Tracker with the default policy.
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_policy(conn, SnapshotPolicy::default())
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn with_policy(conn: &'conn Connection, policy: SnapshotPolicy) -> Self {
        Self { conn, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    /// Count events that belong to the current epoch: all events if the
    /// project has no snapshot, otherwise those not tagged with a snapshot
    /// at or below the latest snapshot id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GanttlineError::Storage`] if a query fails.
    pub fn events_since_last_snapshot(&self, project_id: i64) -> Result<u64> {
        let log = EventLog::new(self.conn);
        match SnapshotStore::new(self.conn).latest_id(project_id)? {
            None => log.count_all(project_id),
            Some(latest) => log.count_since(project_id, latest),
        }
    }

    /// Record one change, taking a snapshot first when the policy says so.
    ///
    /// A snapshot created here is not removed if the event insert then
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GanttlineError::ProjectNotFound`] if a snapshot was
    /// due but the project no longer exists, or
    /// [`crate::GanttlineError::Storage`] on database failure.
    pub fn track_change(&self, change: &ChangeDescriptor) -> Result<TrackOutcome> {
        let project_id = change.project_id;
        let snapshots = SnapshotStore::new(self.conn);

        let since = self.events_since_last_snapshot(project_id)?;
        let latest_at = snapshots.latest_timestamp(project_id)?;
        let take = self.policy.should_snapshot(latest_at, since, Utc::now());
        tracing::debug!(
            project_id,
            event_type = %change.event_type,
            events_since_last_snapshot = since,
            has_snapshot = latest_at.is_some(),
            take_snapshot = take,
            "snapshot policy decision"
        );

        let snapshot_id = if take {
            Some(snapshots.create(project_id, change.description.as_deref())?)
        } else {
            None
        };

        let event_id = EventLog::new(self.conn).append(&NewEvent {
            project_id,
            snapshot_id,
            event_type: change.event_type,
            entity_type: change.entity_type,
            entity_id: change.entity_id,
            changes: &change.changes,
        })?;
        tracing::debug!(project_id, event_id, ?snapshot_id, "logged change");

        Ok(TrackOutcome {
            event_id,
            snapshot_id,
        })
    }

    /// Like [`track_change`](Self::track_change), but failures are logged
    /// and discarded so the caller's committed change stands.
    pub fn track_best_effort(&self, change: &ChangeDescriptor) -> Option<TrackOutcome> {
        match self.track_change(change) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::warn!(
                    project_id = change.project_id,
                    event_type = %change.event_type,
                    error = %err,
                    "failed to record change history"
                );
                None
            }
        }
    }
}
