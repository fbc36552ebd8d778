//! ganttline-core library.
//!
//! Live entity store for projects, users, main tasks and subtasks, plus the
//! change-history engine: an append-only event log paired with periodic
//! full snapshots, and transactional point-in-time restore.
//!
//! # Conventions
//!
//! - **Storage**: every component takes an explicit `&rusqlite::Connection`.
//! - **Errors**: library code returns [`Result`] with [`GanttlineError`];
//!   setup code (`db`, `config`) uses `anyhow::Result`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod model;
pub mod ops;
pub mod store;
pub mod timestamp;

pub use error::{ErrorCode, GanttlineError, Result};
pub use history::{History, HistoryView};
pub use ops::{Applied, Ops};
