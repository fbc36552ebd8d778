//! Append-only change log.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::model::kinds::UnknownTag;
use crate::model::{EntityType, EventType};
use crate::timestamp;

/// Hard cap on rows returned by one history page.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Clamp a caller-supplied page size into `1..=MAX_PAGE_LIMIT`.
#[must_use]
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_LIMIT)
}

/// A stored change-log row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEvent {
    pub id: i64,
    pub project_id: i64,
    /// Snapshot taken immediately before this event was logged, if any.
    pub snapshot_id: Option<i64>,
    pub event_type: EventType,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub changes: Value,
    pub created_at: DateTime<Utc>,
}

/// Row to append.
#[derive(Debug, Clone, Copy)]
pub struct NewEvent<'a> {
    pub project_id: i64,
    pub snapshot_id: Option<i64>,
    pub event_type: EventType,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub changes: &'a Value,
}

pub struct EventLog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> EventLog<'conn> {
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Append one event stamped with the current time. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GanttlineError::Storage`] if the insert fails.
    pub fn append(&self, event: &NewEvent<'_>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO project_events
                (project_id, snapshot_id, event_type, entity_type, entity_id, changes, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.project_id,
                event.snapshot_id,
                event.event_type.as_str(),
                event.entity_type.as_str(),
                event.entity_id,
                event.changes.to_string(),
                timestamp::now_us(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest events of a project, at most `limit` (clamped to
    /// [`MAX_PAGE_LIMIT`]).
    ///
    /// Rows whose event or entity tag this build does not know are logged
    /// and skipped, so a page may hold fewer than `limit` events.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GanttlineError::Storage`] if the query fails or a
    /// stored row carries a non-JSON payload.
    pub fn list_recent(&self, project_id: i64, limit: usize) -> Result<Vec<HistoryEvent>> {
        let limit = i64::try_from(clamp_limit(limit)).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, snapshot_id, event_type, entity_type, entity_id,
                    changes, created_at_us
             FROM project_events
             WHERE project_id = ?1
             ORDER BY created_at_us DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![project_id, limit], row_to_event)?;

        let mut events = Vec::new();
        for row in rows {
            match row? {
                Ok(event) => events.push(event),
                Err((event_id, tag)) => tracing::warn!(
                    project_id,
                    event_id,
                    error = %tag,
                    "skipping event with unknown tag"
                ),
            }
        }
        Ok(events)
    }

    /// Every event ever logged for the project.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GanttlineError::Storage`] if the query fails.
    pub fn count_all(&self, project_id: i64) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM project_events WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    /// Events that did not take a snapshot, or that reference a snapshot
    /// with an id above `snapshot_id`.
    ///
    /// Null events from every earlier epoch are included, so the count only
    /// grows between snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GanttlineError::Storage`] if the query fails.
    pub fn count_since(&self, project_id: i64, snapshot_id: i64) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM project_events
             WHERE project_id = ?1 AND (snapshot_id IS NULL OR snapshot_id > ?2)",
            params![project_id, snapshot_id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}

/// Inner `Err` carries the row id and the tag that failed to parse.
type MappedRow = std::result::Result<HistoryEvent, (i64, UnknownTag)>;

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<MappedRow> {
    let id: i64 = row.get(0)?;
    let event_type: String = row.get(3)?;
    let entity_type: String = row.get(4)?;
    let parsed = (
        event_type.parse::<EventType>(),
        entity_type.parse::<EntityType>(),
    );
    let (event_type, entity_type) = match parsed {
        (Ok(ev), Ok(en)) => (ev, en),
        (Err(tag), _) | (_, Err(tag)) => return Ok(Err((id, tag))),
    };
    let changes: String = row.get(6)?;
    Ok(Ok(HistoryEvent {
        id,
        project_id: row.get(1)?,
        snapshot_id: row.get(2)?,
        event_type,
        entity_type,
        entity_id: row.get(5)?,
        changes: serde_json::from_str(&changes).map_err(|e| conversion_error(6, e))?,
        created_at: timestamp::from_us(row.get(7)?),
    }))
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}
