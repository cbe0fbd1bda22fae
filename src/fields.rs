//! Enumerations and field types for task tracking.
//!
//! This module defines the fixed category set a task is filed under and the
//! three-state workflow status, including the transition edges between states.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Top-level classification of a task. The set is fixed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    #[serde(alias = "robot")]
    Robot,
    #[serde(alias = "project")]
    Project,
    #[serde(alias = "other")]
    Other,
}

impl Category {
    /// Every category, in board column order.
    pub const ALL: [Category; 3] = [Category::Robot, Category::Project, Category::Other];

    /// Display name, also used as the key in the persisted subcategory map.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Robot => "Robot",
            Category::Project => "Project",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status of a task.
///
/// The workflow is linear: `NotStarted -> InProgress -> Completed`, with a
/// single backwards edge out of each non-initial state. No edge skips a state
/// and `Completed` is not terminal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl Status {
    /// The state reached by moving forward, if any.
    pub fn next(self) -> Option<Status> {
        match self {
            Status::NotStarted => Some(Status::InProgress),
            Status::InProgress => Some(Status::Completed),
            Status::Completed => None,
        }
    }

    /// The state reached by moving back, if any.
    pub fn previous(self) -> Option<Status> {
        match self {
            Status::NotStarted => None,
            Status::InProgress => Some(Status::NotStarted),
            Status::Completed => Some(Status::InProgress),
        }
    }

    pub fn is_completed(self) -> bool {
        self == Status::Completed
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::NotStarted => "Not Started",
        Status::InProgress => "In Progress",
        Status::Completed => "COMPLETED",
    }
}

/// Label for the action that moves a task forward from `s`.
pub fn format_advance_action(s: Status) -> Option<&'static str> {
    match s {
        Status::NotStarted => Some("Start"),
        Status::InProgress => Some("Finish"),
        Status::Completed => None,
    }
}
