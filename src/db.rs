//! Task store and utility functions for task tracking.
//!
//! This module provides the `TaskStore` that owns the task collection and
//! writes it through to persistent storage after every mutation, along with
//! utility functions for date parsing, formatting and identifier resolution.

use chrono::{Datelike, Duration, NaiveDate};
use mockable::Clock;

use crate::error::{StorageError, TrackerResult};
use crate::fields::Status;
use crate::storage::{load_record, save_record, KeyValueStore, TASKS_KEY};
use crate::task::{Note, Task, TaskDraft, TaskId};

/// In-memory, write-through collection of tasks.
pub struct TaskStore<S: KeyValueStore, C: Clock> {
    tasks: Vec<Task>,
    storage: S,
    clock: C,
}

impl<S: KeyValueStore, C: Clock> TaskStore<S, C> {
    /// Load the task collection, starting empty if nothing was stored yet.
    pub fn load(storage: S, clock: C) -> Result<Self, StorageError> {
        let tasks: Vec<Task> = load_record(&storage, TASKS_KEY)?.unwrap_or_default();
        tracing::debug!(count = tasks.len(), "tasks loaded");
        Ok(TaskStore { tasks, storage, clock })
    }

    fn save(&mut self) -> Result<(), StorageError> {
        save_record(&mut self.storage, TASKS_KEY, &self.tasks)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Get a task by ID.
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    /// Completed tasks in collection order.
    pub fn completed(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status.is_completed()).collect()
    }

    /// Validate `draft` and append it as a new, not-started task.
    pub fn create(&mut self, draft: TaskDraft) -> TrackerResult<Task> {
        let draft = draft.normalise()?;
        let now = self.clock.utc();
        let task = Task {
            id: TaskId::generate(now, self.tasks.iter().map(|t| &t.id)),
            names: draft.names,
            description: draft.description,
            category: draft.category,
            subcategory: draft.subcategory,
            status: Status::NotStarted,
            created_at: now,
            notes: Vec::new(),
            deadline: draft.deadline,
        };
        self.tasks.push(task.clone());
        self.save()?;
        tracing::info!(id = %task.id, category = %task.category, "task created");
        Ok(task)
    }

    /// Move a task one step forward. Returns the new status, or `None` when the
    /// id is unknown or the task is already completed.
    pub fn advance(&mut self, id: &TaskId) -> TrackerResult<Option<Status>> {
        self.transition(id, Status::next)
    }

    /// Move a task one step back. Returns the new status, or `None` when the id
    /// is unknown or the task has not been started.
    pub fn retreat(&mut self, id: &TaskId) -> TrackerResult<Option<Status>> {
        self.transition(id, Status::previous)
    }

    fn transition(&mut self, id: &TaskId, edge: fn(Status) -> Option<Status>) -> TrackerResult<Option<Status>> {
        let Some(task) = self.get_mut(id) else {
            tracing::warn!(%id, "status change for unknown task ignored");
            return Ok(None);
        };
        let Some(next) = edge(task.status) else {
            return Ok(None);
        };
        let from = task.status;
        task.status = next;
        self.save()?;
        tracing::info!(%id, ?from, to = ?next, "task status changed");
        Ok(Some(next))
    }

    /// Overwrite the editable fields of a task. Status, creation time, notes
    /// and id are left untouched. Returns `false` for an unknown id.
    pub fn update(&mut self, id: &TaskId, draft: TaskDraft) -> TrackerResult<bool> {
        let draft = draft.normalise()?;
        let Some(task) = self.get_mut(id) else {
            tracing::warn!(%id, "update for unknown task ignored");
            return Ok(false);
        };
        task.names = draft.names;
        task.description = draft.description;
        task.category = draft.category;
        task.subcategory = draft.subcategory;
        task.deadline = draft.deadline;
        self.save()?;
        tracing::info!(%id, "task updated");
        Ok(true)
    }

    /// Delete a task. Returns the removed task, or `None` for an unknown id.
    pub fn remove(&mut self, id: &TaskId) -> TrackerResult<Option<Task>> {
        let Some(idx) = self.tasks.iter().position(|t| &t.id == id) else {
            tracing::warn!(%id, "removal of unknown task ignored");
            return Ok(None);
        };
        let removed = self.tasks.remove(idx);
        self.save()?;
        tracing::info!(%id, "task removed");
        Ok(Some(removed))
    }

    /// Append a note. Blank text and unknown ids are ignored (`false`).
    pub fn append_note(&mut self, id: &TaskId, text: &str) -> TrackerResult<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        let date = self.clock.utc();
        let Some(task) = self.get_mut(id) else {
            tracing::warn!(%id, "note for unknown task ignored");
            return Ok(false);
        };
        task.notes.push(Note { text: text.to_string(), date });
        self.save()?;
        tracing::info!(%id, "note added");
        Ok(true)
    }
}

/// Parse human-readable due date input with smart natural language support.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "next monday", "this friday", bare weekday names
/// - "end of week", "end of month"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_this_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let (num, unit_days) = if let Some(n) = rest.strip_suffix('d') {
            (n, 1)
        } else if let Some(n) = rest.strip_suffix('w') {
            (n, 7)
        } else if let Some(n) = rest.strip_suffix('m') {
            // Approximate: 30 days per month
            (n, 30)
        } else {
            return None;
        };
        let n: i64 = num.trim().parse().ok()?;
        let days = Duration::try_days(n.checked_mul(unit_days)?)?;
        return today.checked_add_signed(days);
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current_day = today.weekday().num_days_from_monday() as i64;
    for (day_name, target_day) in weekdays {
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name || s == format!("this {day_name}") {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {day_name}") {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Format a deadline relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let days = (d - today).num_days();
            match days {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {n}d"),
                n => format!("{}d late", -n),
            }
        }
    }
}

/// Format a deadline the way the report prints it (M/D/YYYY).
pub fn format_deadline(d: NaiveDate) -> String {
    d.format("%-m/%-d/%Y").to_string()
}

/// Today's date in the local timezone.
pub fn local_today<C: Clock>(clock: &C) -> NaiveDate {
    clock.local().date_naive()
}

/// Split comma-separated name inputs, trimming each and dropping blanks.
pub fn split_names(inputs: &[String]) -> Vec<String> {
    inputs
        .iter()
        .flat_map(|raw| raw.split(','))
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Resolve a task identifier to a task ID.
///
/// Tries, in order: an exact id, a unique id suffix, and a unique
/// case-insensitive description match. Ambiguous input is an error listing
/// the candidates.
pub fn resolve_task_identifier(identifier: &str, tasks: &[Task]) -> Result<TaskId, String> {
    let identifier = identifier.trim();
    if let Some(t) = tasks.iter().find(|t| t.id.as_str() == identifier) {
        return Ok(t.id.clone());
    }

    let ambiguous = |matches: &[&Task], what: &str| {
        let mut msg = format!("Multiple tasks match {what} '{identifier}':\n");
        for t in matches {
            msg.push_str(&format!("  {}: {} ({})\n", t.id, t.description, t.category));
        }
        msg.push_str("Please use the full ID instead.");
        msg
    };

    if identifier.chars().all(|c| c.is_ascii_digit()) && !identifier.is_empty() {
        let matches: Vec<&Task> = tasks.iter().filter(|t| t.id.as_str().ends_with(identifier)).collect();
        match matches.len() {
            0 => {}
            1 => return Ok(matches[0].id.clone()),
            _ => return Err(ambiguous(&matches, "ID suffix")),
        }
    }

    let lowered = identifier.to_lowercase();
    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.description.to_lowercase() == lowered)
        .collect();
    match matches.len() {
        0 => Err(format!("Task '{identifier}' not found.")),
        1 => Ok(matches[0].id.clone()),
        _ => Err(ambiguous(&matches, "description")),
    }
}

/// Print tasks in a formatted table, one row per task.
pub fn print_table(tasks: &[&Task], today: NaiveDate) {
    println!(
        "{:<14} {:<12} {:<14} {:<20} {}",
        "ID", "Status", "Deadline", "Assigned", "Description"
    );
    for t in tasks {
        let mut due = format_due_relative(t.deadline, today);
        if t.is_overdue(today) {
            due.push_str(" !");
        }
        println!(
            "{:<14} {:<12} {:<14} {:<20} {}",
            t.id,
            crate::fields::format_status(t.status),
            due,
            truncate(&t.joined_names(), 20),
            t.description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use crate::error::{TrackerError, ValidationError};
    use crate::fields::Category;
    use crate::testing::MemoryStore;
    use crate::testing::{FailingStore, FixedClock};

    fn store() -> TaskStore<MemoryStore, FixedClock> {
        TaskStore::load(MemoryStore::new(), FixedClock::at_millis(1_700_000_000_000)).unwrap()
    }

    fn draft(desc: &str) -> TaskDraft {
        TaskDraft::new(vec!["Alice".to_string()], desc, Category::Robot)
    }

    #[test]
    fn test_create_starts_not_started_with_no_notes() {
        let mut s = store();
        let t = s.create(draft("Build intake")).unwrap();
        assert_eq!(t.status, Status::NotStarted);
        assert!(t.notes.is_empty());
        assert_eq!(t.created_at, s.clock().utc());
        assert_eq!(s.tasks().len(), 1);
        assert_eq!(s.storage().writes(), 1);
    }

    #[test]
    fn test_create_assigns_unique_ids_at_same_instant() {
        let mut s = store();
        let a = s.create(draft("a")).unwrap();
        let b = s.create(draft("b")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_create_without_names_is_rejected_and_nothing_written() {
        let mut s = store();
        let err = s.create(TaskDraft::new(Vec::<String>::new(), "x", Category::Robot)).unwrap_err();
        assert!(matches!(err, TrackerError::Validation(ValidationError::NoAssignees)));
        assert!(s.tasks().is_empty());
        assert_eq!(s.storage().writes(), 0);
    }

    #[test]
    fn test_create_with_blank_description_is_rejected() {
        let mut s = store();
        let err = s.create(draft("   ")).unwrap_err();
        assert!(matches!(err, TrackerError::Validation(ValidationError::EmptyDescription)));
        assert!(s.tasks().is_empty());
    }

    #[test]
    fn test_advance_and_retreat_round_trips() {
        let mut s = store();
        let id = s.create(draft("x")).unwrap().id;

        assert_eq!(s.advance(&id).unwrap(), Some(Status::InProgress));
        assert_eq!(s.retreat(&id).unwrap(), Some(Status::NotStarted));

        s.advance(&id).unwrap();
        assert_eq!(s.advance(&id).unwrap(), Some(Status::Completed));
        assert_eq!(s.retreat(&id).unwrap(), Some(Status::InProgress));
        assert_eq!(s.get(&id).unwrap().status, Status::InProgress);
    }

    #[test]
    fn test_advance_past_completed_is_noop() {
        let mut s = store();
        let id = s.create(draft("x")).unwrap().id;
        s.advance(&id).unwrap();
        s.advance(&id).unwrap();
        let writes = s.storage().writes();
        assert_eq!(s.advance(&id).unwrap(), None);
        assert_eq!(s.get(&id).unwrap().status, Status::Completed);
        assert_eq!(s.storage().writes(), writes);
    }

    #[test]
    fn test_retreat_from_not_started_is_noop() {
        let mut s = store();
        let id = s.create(draft("x")).unwrap().id;
        assert_eq!(s.retreat(&id).unwrap(), None);
        assert_eq!(s.get(&id).unwrap().status, Status::NotStarted);
    }

    #[test]
    fn test_unknown_id_is_silent_noop() {
        let mut s = store();
        s.create(draft("x")).unwrap();
        let ghost = TaskId::from("nope");
        let before = s.tasks().to_vec();
        assert_eq!(s.advance(&ghost).unwrap(), None);
        assert_eq!(s.retreat(&ghost).unwrap(), None);
        assert!(!s.update(&ghost, draft("y")).unwrap());
        assert!(s.remove(&ghost).unwrap().is_none());
        assert!(!s.append_note(&ghost, "hello").unwrap());
        assert_eq!(s.tasks(), before.as_slice());
        assert_eq!(s.storage().writes(), 1);
    }

    #[test]
    fn test_update_preserves_status_notes_and_creation() {
        let mut s = store();
        let original = s.create(draft("x")).unwrap();
        s.advance(&original.id).unwrap();
        s.append_note(&original.id, "first").unwrap();

        let new_fields = TaskDraft::new(vec!["Bob".into(), "Cy".into()], "y", Category::Other)
            .with_subcategory("Outreach")
            .with_deadline(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert!(s.update(&original.id, new_fields).unwrap());

        let t = s.get(&original.id).unwrap();
        assert_eq!(t.names, vec!["Bob".to_string(), "Cy".to_string()]);
        assert_eq!(t.description, "y");
        assert_eq!(t.category, Category::Other);
        assert_eq!(t.subcategory.as_deref(), Some("Outreach"));
        assert_eq!(t.status, Status::InProgress);
        assert_eq!(t.created_at, original.created_at);
        assert_eq!(t.notes.len(), 1);
    }

    #[test]
    fn test_update_validation_leaves_task_untouched() {
        let mut s = store();
        let original = s.create(draft("x")).unwrap();
        assert!(s.update(&original.id, draft(" ")).is_err());
        assert_eq!(s.get(&original.id), Some(&original));
    }

    #[test]
    fn test_notes_append_in_order_and_skip_blank() {
        let mut s = store();
        let id = s.create(draft("x")).unwrap().id;
        assert!(s.append_note(&id, " one ").unwrap());
        assert!(!s.append_note(&id, "   ").unwrap());
        assert!(s.append_note(&id, "two").unwrap());
        let texts: Vec<&str> = s.get(&id).unwrap().notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_remove_deletes_task() {
        let mut s = store();
        let id = s.create(draft("x")).unwrap().id;
        let removed = s.remove(&id).unwrap().unwrap();
        assert_eq!(removed.id, id);
        assert!(s.get(&id).is_none());
    }

    #[test]
    fn test_mutations_are_written_through() {
        let mut s = store();
        let id = s.create(draft("x")).unwrap().id;
        s.advance(&id).unwrap();
        let saved: Vec<Task> = serde_json::from_str(s.storage().get(TASKS_KEY).unwrap()).unwrap();
        assert_eq!(saved, s.tasks());
    }

    #[test]
    fn test_persistence_failure_propagates() {
        let mut s = TaskStore::load(FailingStore, FixedClock::at_millis(0)).unwrap();
        let err = s.create(draft("x")).unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
    }

    #[test]
    fn test_load_back_fills_legacy_records() {
        let stored = r#"[{"id":"1","name":"Alice","task":"x","category":"Robot",
            "status":"not_started","createdAt":"2025-01-10T15:00:00Z"}]"#;
        let s = TaskStore::load(
            MemoryStore::new().with_record(TASKS_KEY, stored),
            FixedClock::at_millis(0),
        )
        .unwrap();
        assert_eq!(s.tasks()[0].names, vec!["Alice".to_string()]);
        assert!(s.tasks()[0].notes.is_empty());
    }

    #[test]
    fn test_parse_due_input() {
        // 2025-03-12 is a Wednesday
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
        assert_eq!(parse_due_input("today", today), d(2025, 3, 12));
        assert_eq!(parse_due_input("Tomorrow", today), d(2025, 3, 13));
        assert_eq!(parse_due_input("in 3d", today), d(2025, 3, 15));
        assert_eq!(parse_due_input("in 2w", today), d(2025, 3, 26));
        assert_eq!(parse_due_input("fri", today), d(2025, 3, 14));
        assert_eq!(parse_due_input("wednesday", today), d(2025, 3, 12));
        assert_eq!(parse_due_input("next wednesday", today), d(2025, 3, 19));
        assert_eq!(parse_due_input("eow", today), d(2025, 3, 16));
        assert_eq!(parse_due_input("eom", today), d(2025, 3, 31));
        assert_eq!(parse_due_input("2025-12-01", today), d(2025, 12, 1));
        assert_eq!(parse_due_input("someday", today), None);
        assert_eq!(parse_due_input("in -2d", today), d(2025, 3, 10));
    }

    #[rstest]
    #[case("in 99999999999d")]
    #[case("in 9223372036854775807w")]
    #[case("in -9223372036854775808m")]
    #[case("in 300000000d")]
    fn test_parse_due_input_out_of_range_is_rejected(#[case] input: &str) {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(parse_due_input(input, today), None);
    }

    #[test]
    fn test_format_due_relative() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(format_due_relative(None, today), "-");
        assert_eq!(format_due_relative(Some(today), today), "today");
        assert_eq!(format_due_relative(today.succ_opt(), today), "tomorrow");
        assert_eq!(format_due_relative(today.pred_opt(), today), "1d late");
        assert_eq!(format_deadline(today), "3/12/2025");
    }

    #[test]
    fn test_resolve_task_identifier() {
        let mut s = store();
        let a = s.create(draft("Wire arm")).unwrap().id;
        let b = s.create(draft("Paint frame")).unwrap().id;
        assert_eq!(resolve_task_identifier(a.as_str(), s.tasks()), Ok(a.clone()));
        let suffix = &b.as_str()[b.as_str().len() - 1..];
        assert_eq!(resolve_task_identifier(suffix, s.tasks()), Ok(b.clone()));
        assert_eq!(resolve_task_identifier("wire ARM", s.tasks()), Ok(a));
        assert_eq!(
            resolve_task_identifier("missing", s.tasks()),
            Err("Task 'missing' not found.".to_string())
        );
    }

    #[test]
    fn test_split_names() {
        let names = split_names(&["Ann, Bo".to_string(), " ".to_string(), "Cy".to_string()]);
        assert_eq!(names, vec!["Ann", "Bo", "Cy"]);
    }
}
