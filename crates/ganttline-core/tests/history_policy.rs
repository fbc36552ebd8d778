//! Snapshot policy behaviour against a real database: first snapshot,
//! event-count threshold, age threshold, and the cross-epoch counting rule.

use chrono::Duration;
use ganttline_core::db;
use ganttline_core::history::{
    ChangeDescriptor, ChangeTracker, EventLog, SnapshotPolicy, SnapshotStore, TrackOutcome,
};
use ganttline_core::model::{EntityType, EventType};
use ganttline_core::store::{self, NewProject};
use ganttline_core::timestamp;
use rusqlite::{Connection, params};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (Connection, i64) {
    let conn = db::open_in_memory().expect("open db");
    let project = store::projects::insert_project(
        &conn,
        &NewProject {
            name: "Launch",
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 6).expect("date"),
            password: None,
        },
    )
    .expect("insert project");
    (conn, project.id)
}

fn rename(project_id: i64, n: usize) -> ChangeDescriptor {
    ChangeDescriptor {
        project_id,
        event_type: EventType::UpdateProject,
        entity_type: EntityType::Project,
        entity_id: Some(project_id),
        changes: json!({ "name": { "old": format!("v{n}"), "new": format!("v{}", n + 1) } }),
        description: Some(format!("rename #{n}")),
    }
}

fn track_n(tracker: &ChangeTracker<'_>, project_id: i64, n: usize) -> Vec<TrackOutcome> {
    (0..n)
        .map(|i| tracker.track_change(&rename(project_id, i)).expect("track"))
        .collect()
}

fn snapshot_count(conn: &Connection, project_id: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM project_snapshots WHERE project_id = ?1",
        params![project_id],
        |row| row.get(0),
    )
    .expect("count snapshots")
}

fn backdate_snapshot(conn: &Connection, snapshot_id: i64, secs: i64) {
    let at = timestamp::now_us() - secs * 1_000_000;
    conn.execute(
        "UPDATE project_snapshots SET created_at_us = ?1 WHERE id = ?2",
        params![at, snapshot_id],
    )
    .expect("backdate snapshot");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn first_change_creates_exactly_one_snapshot_and_event() {
    let (conn, project) = setup();
    let outcome = ChangeTracker::new(&conn)
        .track_change(&rename(project, 0))
        .expect("track");

    assert_eq!(snapshot_count(&conn, project), 1);
    let events = EventLog::new(&conn).list_recent(project, 100).expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].snapshot_id, outcome.snapshot_id);
    assert!(outcome.snapshot_id.is_some());
}

#[test]
fn changes_below_threshold_do_not_snapshot() {
    let (conn, project) = setup();
    let tracker = ChangeTracker::new(&conn);
    track_n(&tracker, project, 1);

    let outcomes = track_n(&tracker, project, 9);
    assert!(outcomes.iter().all(|o| o.snapshot_id.is_none()));
    assert_eq!(snapshot_count(&conn, project), 1);
    assert_eq!(tracker.events_since_last_snapshot(project).expect("count"), 9);
}

#[test]
fn change_after_ten_untagged_events_snapshots() {
    let (conn, project) = setup();
    let tracker = ChangeTracker::new(&conn);
    let first = track_n(&tracker, project, 1)[0];

    let quiet = track_n(&tracker, project, 10);
    assert!(quiet.iter().all(|o| o.snapshot_id.is_none()));
    assert_eq!(tracker.events_since_last_snapshot(project).expect("count"), 10);

    let next = tracker.track_change(&rename(project, 99)).expect("track");
    let snapshot = next.snapshot_id.expect("threshold snapshot");
    assert!(snapshot > first.snapshot_id.expect("first snapshot"));
    assert_eq!(snapshot_count(&conn, project), 2);
}

#[test]
fn untagged_events_from_older_epochs_keep_counting() {
    let (conn, project) = setup();
    let tracker = ChangeTracker::new(&conn);
    track_n(&tracker, project, 11);
    let crossing = tracker.track_change(&rename(project, 11)).expect("track");
    assert!(crossing.snapshot_id.is_some());

    // The ten untagged events of the first epoch still match
    // `snapshot_id IS NULL`, so the count never drops below the threshold.
    assert_eq!(tracker.events_since_last_snapshot(project).expect("count"), 10);
    let after = track_n(&tracker, project, 3);
    assert!(after.iter().all(|o| o.snapshot_id.is_some()));
    assert_eq!(snapshot_count(&conn, project), 5);
}

#[test]
fn stale_snapshot_triggers_regardless_of_count() {
    let (conn, project) = setup();
    let tracker = ChangeTracker::new(&conn);
    let first = track_n(&tracker, project, 1)[0];
    let snapshot = first.snapshot_id.expect("first snapshot");

    backdate_snapshot(&conn, snapshot, 3_000);
    assert!(
        tracker
            .track_change(&rename(project, 1))
            .expect("track")
            .snapshot_id
            .is_none()
    );

    backdate_snapshot(&conn, snapshot, 3_601);
    let outcome = tracker.track_change(&rename(project, 2)).expect("track");
    assert!(outcome.snapshot_id.is_some());
    assert_eq!(
        tracker.events_since_last_snapshot(project).expect("count"),
        1,
        "only the earlier untagged event remains in the count"
    );
}

#[test]
fn configured_policy_is_honoured() {
    let (conn, project) = setup();
    let policy = SnapshotPolicy {
        event_threshold: 2,
        max_age: Duration::hours(24),
    };
    let tracker = ChangeTracker::with_policy(&conn, policy);
    let outcomes = track_n(&tracker, project, 4);
    let took: Vec<bool> = outcomes.iter().map(|o| o.snapshot_id.is_some()).collect();
    assert_eq!(took, vec![true, false, false, true]);
}

#[test]
fn snapshot_description_comes_from_the_change() {
    let (conn, project) = setup();
    ChangeTracker::new(&conn)
        .track_change(&rename(project, 0))
        .expect("track");
    let listed = SnapshotStore::new(&conn).list_recent(project, 10).expect("list");
    assert_eq!(listed[0].description.as_deref(), Some("rename #0"));
}

#[test]
fn failed_event_insert_leaves_snapshot_in_place() {
    let (conn, project) = setup();
    conn.execute_batch(
        "CREATE TRIGGER reject_events BEFORE INSERT ON project_events
         BEGIN SELECT RAISE(ABORT, 'log offline'); END;",
    )
    .expect("install trigger");

    let tracker = ChangeTracker::new(&conn);
    assert!(tracker.track_change(&rename(project, 0)).is_err());
    assert_eq!(snapshot_count(&conn, project), 1);
    assert!(tracker.track_best_effort(&rename(project, 1)).is_none());
    assert_eq!(snapshot_count(&conn, project), 1);
    assert!(EventLog::new(&conn).list_recent(project, 10).expect("events").is_empty());
}
