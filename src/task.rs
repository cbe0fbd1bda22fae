//! Task data structure and related functionality.
//!
//! This module defines the core `Task` record, its append-only notes, and the
//! `TaskDraft` used to create or overwrite the editable fields of a task.
//! Records written by older releases carry a single `name` instead of `names`
//! and may lack `notes`; both are back-filled on load and never written again.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::fields::{Category, Status};

/// Assignee substituted when a stored record carries no usable name.
pub const UNASSIGNED: &str = "Unassigned";

/// Opaque unique task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate an id from the creation instant, bumped until it is not in `taken`.
    pub fn generate<'a>(now: DateTime<Utc>, taken: impl Iterator<Item = &'a TaskId> + Clone) -> Self {
        let mut candidate = now.timestamp_millis();
        loop {
            let id = TaskId(candidate.to_string());
            if !taken.clone().any(|t| *t == id) {
                return id;
            }
            candidate += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A timestamped free-text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub date: DateTime<Utc>,
}

/// A unit of tracked work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredTask")]
pub struct Task {
    pub id: TaskId,
    pub names: Vec<String>,
    #[serde(rename = "task")]
    pub description: String,
    pub category: Category,
    pub subcategory: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub notes: Vec<Note>,
    pub deadline: Option<NaiveDate>,
}

impl Task {
    /// Whether the deadline has passed without the task being completed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.deadline {
            Some(d) => d < today && !self.status.is_completed(),
            None => false,
        }
    }

    /// Assignees joined for display.
    pub fn joined_names(&self) -> String {
        self.names.join(", ")
    }
}

/// Legacy `name` field: older records hold a string, some an array.
#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyName {
    One(String),
    Many(Vec<String>),
}

/// On-disk shape of a task, tolerant of missing optional fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    id: TaskId,
    #[serde(default)]
    names: Option<Vec<String>>,
    #[serde(default)]
    name: Option<LegacyName>,
    #[serde(rename = "task")]
    description: String,
    category: Category,
    #[serde(default)]
    subcategory: Option<String>,
    #[serde(default)]
    status: Status,
    created_at: DateTime<Utc>,
    #[serde(default)]
    notes: Option<Vec<Note>>,
    #[serde(default)]
    deadline: Option<NaiveDate>,
}

impl From<StoredTask> for Task {
    fn from(raw: StoredTask) -> Self {
        let names = raw
            .names
            .filter(|n| !n.is_empty())
            .or_else(|| match raw.name {
                Some(LegacyName::One(n)) if !n.trim().is_empty() => Some(vec![n]),
                Some(LegacyName::Many(v)) if !v.is_empty() => Some(v),
                _ => None,
            })
            .unwrap_or_else(|| vec![UNASSIGNED.to_string()]);

        Task {
            id: raw.id,
            names,
            description: raw.description,
            category: raw.category,
            subcategory: raw.subcategory.filter(|s| !s.trim().is_empty()),
            status: raw.status,
            created_at: raw.created_at,
            notes: raw.notes.unwrap_or_default(),
            deadline: raw.deadline,
        }
    }
}

/// The editable fields of a task, as supplied to create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub names: Vec<String>,
    pub description: String,
    pub category: Category,
    pub subcategory: Option<String>,
    pub deadline: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(names: impl IntoIterator<Item = String>, description: impl Into<String>, category: Category) -> Self {
        TaskDraft {
            names: names.into_iter().collect(),
            description: description.into(),
            category,
            subcategory: None,
            deadline: None,
        }
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Copy the editable fields out of an existing task.
    pub fn from_task(task: &Task) -> Self {
        TaskDraft {
            names: task.names.clone(),
            description: task.description.clone(),
            category: task.category,
            subcategory: task.subcategory.clone(),
            deadline: task.deadline,
        }
    }

    /// Trim every text field and check the required ones.
    pub fn normalise(self) -> Result<TaskDraft, ValidationError> {
        let names: Vec<String> = self
            .names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(ValidationError::NoAssignees);
        }
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        Ok(TaskDraft {
            names,
            description,
            category: self.category,
            subcategory: self.subcategory.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            deadline: self.deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    #[test]
    fn test_legacy_name_becomes_names() {
        let json = r#"{"id":"1","name":"Alice","task":"Wire the arm","category":"Robot",
            "status":"in_progress","createdAt":"2025-01-10T15:00:00.000Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.names, vec!["Alice".to_string()]);
        assert!(task.notes.is_empty());
        assert_eq!(task.status, Status::InProgress);
    }

    #[test]
    fn test_legacy_name_array_becomes_names() {
        let json = r#"{"id":"2","name":["Ann","Bo"],"task":"x","category":"Robot",
            "createdAt":"2025-01-10T15:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.names, vec!["Ann".to_string(), "Bo".to_string()]);
    }

    #[test]
    fn test_empty_names_defers_to_legacy_name() {
        let json = r#"{"id":"3","names":[],"name":"Cy","task":"x","category":"Other",
            "createdAt":"2025-01-10T15:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.names, vec!["Cy".to_string()]);

        let json = r#"{"id":"4","names":[],"name":[],"task":"x","category":"Other",
            "createdAt":"2025-01-10T15:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.names, vec![UNASSIGNED.to_string()]);
    }

    #[test]
    fn test_missing_names_falls_back_to_unassigned() {
        let json = r#"{"id":"1","task":"x","category":"Other","status":"not_started",
            "createdAt":"2025-01-10T15:00:00Z","notes":null}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.names, vec![UNASSIGNED.to_string()]);
        assert!(task.notes.is_empty());
    }

    #[test]
    fn test_legacy_field_is_not_written_back() {
        let json = r#"{"id":"7","name":"Bo","task":"x","category":"Project","subcategory":null,
            "status":"completed","createdAt":"2025-01-10T15:00:00Z","deadline":"2025-02-01"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        let out = serde_json::to_value(&task).unwrap();
        assert!(out.get("name").is_none());
        assert_eq!(out["names"], serde_json::json!(["Bo"]));
        assert_eq!(out["task"], "x");
        assert_eq!(out["deadline"], "2025-02-01");
        assert!(out.get("createdAt").is_some());
    }

    #[test]
    fn test_structural_corruption_is_a_parse_error() {
        let json = r#"{"id":"1","names":["A"],"category":"Robot","createdAt":"2025-01-10T15:00:00Z"}"#;
        assert!(serde_json::from_str::<Task>(json).is_err());
    }

    #[test]
    fn test_generate_skips_taken_ids() {
        let taken = [TaskId::from("1000"), TaskId::from("1001")];
        let id = TaskId::generate(ts(1000), taken.iter());
        assert_eq!(id.as_str(), "1002");
    }

    #[test]
    fn test_draft_normalise_trims_and_validates() {
        let draft = TaskDraft::new(vec!["  Ann ".into(), " ".into()], "  fix it ", Category::Robot)
            .with_subcategory("   ");
        let ok = draft.normalise().unwrap();
        assert_eq!(ok.names, vec!["Ann".to_string()]);
        assert_eq!(ok.description, "fix it");
        assert_eq!(ok.subcategory, None);

        let err = TaskDraft::new(Vec::<String>::new(), "x", Category::Robot).normalise();
        assert_eq!(err, Err(ValidationError::NoAssignees));
        let err = TaskDraft::new(vec!["A".into()], "   ", Category::Robot).normalise();
        assert_eq!(err, Err(ValidationError::EmptyDescription));
    }

    #[test]
    fn test_overdue_ignores_completed() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut task: Task = serde_json::from_str(
            r#"{"id":"1","names":["A"],"task":"x","category":"Robot","status":"in_progress",
            "createdAt":"2025-01-10T15:00:00Z","notes":[],"deadline":"2025-03-09"}"#,
        )
        .unwrap();
        assert!(task.is_overdue(today));
        task.deadline = Some(today);
        assert!(!task.is_overdue(today));
        task.deadline = NaiveDate::from_ymd_opt(2025, 3, 1);
        task.status = Status::Completed;
        assert!(!task.is_overdue(today));
    }
}
