//! Snapshot document codec.
//!
//! A snapshot document is the JSON form of a [`ProjectState`] with an extra
//! top-level `schema_version`:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "project": { "id": 1, "name": "...", "slug": "...", "password": null, "start_date": "2024-03-01" },
//!   "users": [ { "id": 3, "name": "...", "color": "#999999" } ],
//!   "main_tasks": [
//!     { "id": 7, "name": "...", "position": 0, "start_offset_days": 0,
//!       "subtasks": [ { "id": 9, "main_task_id": 7, "name": "...", "user_id": 3,
//!                       "duration_days": 7, "position": 0 } ] }
//!   ]
//! }
//! ```
//!
//! Documents written before versioning have no `schema_version` and are
//! read as version 0. They may carry integers as numeric strings and an
//! empty string for "no password"; both are normalized on decode. From
//! version 1 on, integer fields must be JSON integers.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::model::ProjectState;

/// Version written by [`encode`].
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

/// Version assumed for documents without a `schema_version` field.
pub const LEGACY_SCHEMA_VERSION: u64 = 0;

/// Why a stored document could not be turned back into a [`ProjectState`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed snapshot document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema_version must be a non-negative integer, got {0}")]
    InvalidVersion(Value),

    #[error("schema_version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u64 },

    #[error("{field} must be an integer, got {value}")]
    NotAnInteger { field: String, value: Value },
}

/// Encode a state as a versioned document.
#[must_use]
pub fn encode(state: &ProjectState) -> Value {
    json!({
        "schema_version": CURRENT_SCHEMA_VERSION,
        "project": state.project,
        "users": state.users,
        "main_tasks": state.main_tasks,
    })
}

/// Encode a state to the compact string stored in `snapshot_data`.
#[must_use]
pub fn encode_to_string(state: &ProjectState) -> String {
    encode(state).to_string()
}

/// Schema version declared by a document.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidVersion`] when the field is present but is
/// not a non-negative integer.
pub fn schema_version(doc: &Value) -> Result<u64, DecodeError> {
    match doc.get("schema_version") {
        None | Some(Value::Null) => Ok(LEGACY_SCHEMA_VERSION),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| DecodeError::InvalidVersion(v.clone())),
    }
}

/// Decode a parsed document.
///
/// # Errors
///
/// Returns [`DecodeError`] if required fields are missing, numeric fields
/// are not integers, or the document is from a newer schema.
pub fn decode(doc: &Value) -> Result<ProjectState, DecodeError> {
    let found = schema_version(doc)?;
    if found > CURRENT_SCHEMA_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    if found > LEGACY_SCHEMA_VERSION {
        reject_string_integers(doc)?;
    }
    Ok(ProjectState::deserialize(doc)?)
}

const PROJECT_INT_FIELDS: &[&str] = &["id"];
const USER_INT_FIELDS: &[&str] = &["id"];
const MAIN_TASK_INT_FIELDS: &[&str] = &["id", "position", "start_offset_days"];
const SUBTASK_INT_FIELDS: &[&str] = &["id", "main_task_id", "user_id", "duration_days", "position"];

/// Fail on integer fields spelled as JSON strings.
fn reject_string_integers(doc: &Value) -> Result<(), DecodeError> {
    fn check(obj: &Value, path: &str, fields: &[&str]) -> Result<(), DecodeError> {
        for field in fields {
            if let Some(value @ Value::String(_)) = obj.get(*field) {
                return Err(DecodeError::NotAnInteger {
                    field: format!("{path}.{field}"),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    fn entries<'a>(doc: &'a Value, key: &str) -> impl Iterator<Item = (usize, &'a Value)> {
        doc.get(key)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
    }

    if let Some(project) = doc.get("project") {
        check(project, "project", PROJECT_INT_FIELDS)?;
    }
    for (i, user) in entries(doc, "users") {
        check(user, &format!("users[{i}]"), USER_INT_FIELDS)?;
    }
    for (i, task) in entries(doc, "main_tasks") {
        let path = format!("main_tasks[{i}]");
        check(task, &path, MAIN_TASK_INT_FIELDS)?;
        for (j, sub) in entries(task, "subtasks") {
            check(sub, &format!("{path}.subtasks[{j}]"), SUBTASK_INT_FIELDS)?;
        }
    }
    Ok(())
}

/// Parse and decode a stored document string.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] if the text is not JSON, otherwise as
/// [`decode`].
pub fn decode_str(raw: &str) -> Result<ProjectState, DecodeError> {
    let doc: Value = serde_json::from_str(raw)?;
    decode(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MainTaskEntry, ProjectAttributes, Subtask, UserEntry};
    use chrono::NaiveDate;

    fn attrs() -> ProjectAttributes {
        ProjectAttributes {
            id: 1,
            name: "Roadmap".into(),
            slug: "roadmap".into(),
            password: None,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
        }
    }

    fn full_state() -> ProjectState {
        ProjectState {
            project: ProjectAttributes {
                password: Some("s3cret".into()),
                ..attrs()
            },
            users: vec![
                UserEntry {
                    id: 3,
                    name: "Ada".into(),
                    color: "#ff0000".into(),
                },
                UserEntry {
                    id: 4,
                    name: "Bob".into(),
                    color: "#999999".into(),
                },
            ],
            main_tasks: vec![
                MainTaskEntry {
                    id: 7,
                    name: "Design".into(),
                    position: 0,
                    start_offset_days: 0,
                    subtasks: vec![
                        Subtask {
                            id: 9,
                            main_task_id: 7,
                            name: "Sketch".into(),
                            user_id: Some(3),
                            duration_days: 2,
                            position: 0,
                        },
                        Subtask {
                            id: 10,
                            main_task_id: 7,
                            name: "Review".into(),
                            user_id: None,
                            duration_days: 1,
                            position: 1,
                        },
                    ],
                },
                MainTaskEntry {
                    id: 8,
                    name: "Build".into(),
                    position: 1,
                    start_offset_days: 5,
                    subtasks: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn roundtrip_shapes() {
        let users_only = ProjectState {
            users: full_state().users,
            ..ProjectState::empty(attrs())
        };
        let tasks_without_subtasks = ProjectState {
            main_tasks: vec![MainTaskEntry {
                id: 2,
                name: "Main task".into(),
                position: 0,
                start_offset_days: 0,
                subtasks: Vec::new(),
            }],
            ..ProjectState::empty(attrs())
        };
        for state in [
            ProjectState::empty(attrs()),
            users_only,
            tasks_without_subtasks,
            full_state(),
        ] {
            assert_eq!(decode(&encode(&state)).expect("decode"), state);
            assert_eq!(decode_str(&encode_to_string(&state)).expect("decode"), state);
        }
    }

    #[test]
    fn encode_writes_current_version() {
        let doc = encode(&full_state());
        assert_eq!(doc["schema_version"], json!(CURRENT_SCHEMA_VERSION));
        assert_eq!(doc["project"]["start_date"], json!("2024-03-01"));
        assert_eq!(doc["main_tasks"][0]["subtasks"][0]["user_id"], json!(3));
    }

    #[test]
    fn legacy_document_is_normalized() {
        let raw = r##"{
            "project": {"id": "1", "name": "Roadmap", "slug": "roadmap",
                        "password": "", "start_date": "2024-03-01",
                        "created_at": "2024-02-28 10:00:00"},
            "users": [{"id": "3", "project_id": "1", "name": "Ada", "color": "#ff0000"}],
            "main_tasks": [{"id": "7", "project_id": "1", "name": "Design",
                            "position": "0", "start_offset_days": "4",
                            "subtasks": [{"id": "9", "main_task_id": "7", "name": "Sketch",
                                          "user_id": "3", "duration_days": "2", "position": "0"},
                                         {"id": "10", "main_task_id": "7", "name": "Review",
                                          "user_id": null, "duration_days": "1", "position": "1"}]}]
        }"##;

        let state = decode_str(raw).expect("legacy decode");
        assert_eq!(state.project.id, 1);
        assert_eq!(state.project.password, None);
        assert_eq!(state.users[0].id, 3);
        assert_eq!(state.main_tasks[0].start_offset_days, 4);
        let subs = &state.main_tasks[0].subtasks;
        assert_eq!(subs[0].user_id, Some(3));
        assert_eq!(subs[1].user_id, None);
        assert_eq!(subs[1].position, 1);
    }

    #[test]
    fn missing_collections_decode_as_empty() {
        let raw = r#"{"project": {"id": 1, "name": "R", "slug": "r", "start_date": "2024-03-01"}}"#;
        let state = decode_str(raw).expect("decode");
        assert!(state.users.is_empty());
        assert!(state.main_tasks.is_empty());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut doc = encode(&full_state());
        doc["schema_version"] = json!(CURRENT_SCHEMA_VERSION + 1);
        assert!(matches!(
            decode(&doc).unwrap_err(),
            DecodeError::UnsupportedVersion { found: 2, supported: 1 }
        ));
    }

    #[test]
    fn non_integer_version_is_rejected() {
        let mut doc = encode(&full_state());
        doc["schema_version"] = json!("one");
        assert!(matches!(decode(&doc).unwrap_err(), DecodeError::InvalidVersion(_)));
    }

    #[test]
    fn missing_required_fields_fail() {
        assert!(matches!(decode_str("{}").unwrap_err(), DecodeError::Json(_)));
        let no_name = r#"{"project": {"id": 1, "slug": "r", "start_date": "2024-03-01"}}"#;
        assert!(decode_str(no_name).is_err());
    }

    #[test]
    fn non_numeric_ids_fail() {
        let mut doc = encode(&full_state());
        doc["main_tasks"][0]["subtasks"][0]["position"] = json!("first");
        assert!(decode(&doc).is_err());
        let mut doc = encode(&full_state());
        doc["users"][0]["id"] = json!(3.5);
        assert!(decode(&doc).is_err());
    }

    #[test]
    fn versioned_document_rejects_quoted_integers() {
        let mut doc = encode(&full_state());
        doc["main_tasks"][0]["subtasks"][1]["position"] = json!("3");
        match decode(&doc).unwrap_err() {
            DecodeError::NotAnInteger { field, value } => {
                assert_eq!(field, "main_tasks[0].subtasks[1].position");
                assert_eq!(value, json!("3"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut doc = encode(&full_state());
        doc["project"]["id"] = json!("1");
        assert!(matches!(
            decode(&doc).unwrap_err(),
            DecodeError::NotAnInteger { .. }
        ));
    }

    #[test]
    fn quoted_integers_are_accepted_without_version() {
        let mut doc = encode(&full_state());
        doc["main_tasks"][0]["subtasks"][1]["position"] = json!("3");
        doc.as_object_mut().expect("object").remove("schema_version");
        let state = decode(&doc).expect("legacy decode");
        assert_eq!(state.main_tasks[0].subtasks[1].position, 3);

        doc["schema_version"] = json!(LEGACY_SCHEMA_VERSION);
        assert!(decode(&doc).is_ok());
    }

    #[test]
    fn garbage_text_fails() {
        assert!(matches!(decode_str("not json").unwrap_err(), DecodeError::Json(_)));
    }
}
