//! Canonical SQLite schema for ganttline.
//!
//! - `projects`, `users`, `main_tasks`, `subtasks` hold the live entity tree
//! - `project_snapshots` holds immutable full-state documents
//! - `project_events` is the append-only change log; each row optionally
//!   references the snapshot taken for it
//!
//! Every owned table cascades from `projects`, so history does not outlive
//! its project.

/// Migration v1: live entity tables.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL DEFAULT 'untitled',
    slug TEXT NOT NULL UNIQUE,
    password TEXT,
    start_date TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    color TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS main_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    position INTEGER NOT NULL,
    start_offset_days INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS subtasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    main_task_id INTEGER NOT NULL REFERENCES main_tasks(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    duration_days INTEGER NOT NULL CHECK (duration_days >= 1),
    position INTEGER NOT NULL CHECK (position >= 0)
);

CREATE INDEX IF NOT EXISTS idx_users_project
    ON users(project_id, id);

CREATE INDEX IF NOT EXISTS idx_main_tasks_project_position
    ON main_tasks(project_id, position);

CREATE INDEX IF NOT EXISTS idx_subtasks_main_task_position
    ON subtasks(main_task_id, position);

CREATE INDEX IF NOT EXISTS idx_subtasks_user
    ON subtasks(user_id);
"#;

/// Migration v2: snapshot and event history tables.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS project_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    snapshot_data TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS project_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    snapshot_id INTEGER REFERENCES project_snapshots(id) ON DELETE SET NULL,
    event_type TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id INTEGER,
    changes TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_project
    ON project_snapshots(project_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_events_project
    ON project_events(project_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_events_project_snapshot
    ON project_events(project_id, snapshot_id);
"#;

/// Indexes expected by tree loading and history query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_users_project",
    "idx_main_tasks_project_position",
    "idx_subtasks_main_task_position",
    "idx_subtasks_user",
    "idx_snapshots_project",
    "idx_events_project",
    "idx_events_project_snapshot",
];
