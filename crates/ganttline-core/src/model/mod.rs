//! Domain types shared by the entity store and the history engine.

pub mod entity;
pub mod kinds;
pub mod lenient;
pub mod state;

pub use entity::{MainTask, Project, Subtask, User};
pub use kinds::{EntityType, EventType};
pub use state::{MainTaskEntry, ProjectAttributes, ProjectState, UserEntry};
