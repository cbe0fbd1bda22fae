//! Task form handling for the board.
//!
//! This module provides the `TaskForm` used to create a task in the selected
//! column or edit the selected card, including field ordering and the
//! conversion back into a `TaskDraft`.

use chrono::NaiveDate;

use crate::db::{parse_due_input, split_names};
use crate::fields::Category;
use crate::task::{Task, TaskDraft, TaskId};
use crate::tui::input::InputField;

/// Field order, top to bottom.
pub const DESCRIPTION_FIELD: usize = 0;
pub const NAMES_FIELD: usize = 1;
pub const CATEGORY_FIELD: usize = 2;
pub const SUBCATEGORY_FIELD: usize = 3;
pub const DEADLINE_FIELD: usize = 4;
const FIELD_COUNT: usize = 5;

/// Task form for adding or editing
#[derive(Debug, Clone)]
pub struct TaskForm {
    /// `None` while adding a new task.
    pub editing: Option<TaskId>,
    pub description: InputField,
    pub names: InputField,
    pub category: Category,
    pub subcategory: InputField,
    pub deadline: InputField,
    pub current_field: usize,
}

impl TaskForm {
    /// Empty form for a new task in `category`.
    pub fn new(category: Category) -> Self {
        Self {
            editing: None,
            description: InputField::new(),
            names: InputField::new(),
            category,
            subcategory: InputField::new(),
            deadline: InputField::new(),
            current_field: DESCRIPTION_FIELD,
        }
    }

    /// Create a task form populated from an existing task.
    pub fn from_task(task: &Task) -> Self {
        Self {
            editing: Some(task.id.clone()),
            description: InputField::with_value(&task.description),
            names: InputField::with_value(&task.names.join(", ")),
            category: task.category,
            subcategory: InputField::with_value(task.subcategory.as_deref().unwrap_or("")),
            deadline: InputField::with_value(
                &task.deadline.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            ),
            current_field: DESCRIPTION_FIELD,
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
    }

    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
    }

    /// The text field with focus, if focus is not on the category selector.
    pub fn active_input(&self) -> Option<&InputField> {
        match self.current_field {
            DESCRIPTION_FIELD => Some(&self.description),
            NAMES_FIELD => Some(&self.names),
            SUBCATEGORY_FIELD => Some(&self.subcategory),
            DEADLINE_FIELD => Some(&self.deadline),
            _ => None,
        }
    }

    fn active_input_mut(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            DESCRIPTION_FIELD => Some(&mut self.description),
            NAMES_FIELD => Some(&mut self.names),
            SUBCATEGORY_FIELD => Some(&mut self.subcategory),
            DEADLINE_FIELD => Some(&mut self.deadline),
            _ => None,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.active_input_mut() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.active_input_mut() {
            field.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(field) = self.active_input_mut() {
            field.handle_delete();
        }
    }

    /// Left arrow: cursor movement, or the previous category on the selector.
    pub fn handle_left(&mut self) {
        match self.active_input_mut() {
            Some(field) => field.move_cursor_left(),
            None => self.cycle_category(false),
        }
    }

    /// Right arrow: cursor movement, or the next category on the selector.
    pub fn handle_right(&mut self) {
        match self.active_input_mut() {
            Some(field) => field.move_cursor_right(),
            None => self.cycle_category(true),
        }
    }

    fn cycle_category(&mut self, forward: bool) {
        let all = Category::ALL;
        let idx = all.iter().position(|c| *c == self.category).unwrap_or(0);
        let next = if forward { (idx + 1) % all.len() } else { (idx + all.len() - 1) % all.len() };
        self.category = all[next];
    }

    /// Step through the registered subcategories, starting after the current text.
    pub fn cycle_subcategory(&mut self, registered: &[String], forward: bool) {
        if registered.is_empty() {
            return;
        }
        let current = self.subcategory.value.trim();
        let next = match registered.iter().position(|s| s == current) {
            Some(i) if forward => (i + 1) % registered.len(),
            Some(i) => (i + registered.len() - 1) % registered.len(),
            None if forward => 0,
            None => registered.len() - 1,
        };
        self.subcategory = InputField::with_value(&registered[next]);
    }

    /// Collect the form into a draft. Blank optional fields become absent.
    /// Fails with a message when the deadline is not understood.
    pub fn to_draft(&self, today: NaiveDate) -> Result<TaskDraft, String> {
        let deadline = match self.deadline.value.trim() {
            "" => None,
            text => Some(parse_due_input(text, today).ok_or_else(|| format!("Unrecognised deadline '{text}'"))?),
        };
        let subcategory = match self.subcategory.value.trim() {
            "" => None,
            sub => Some(sub.to_string()),
        };
        Ok(TaskDraft {
            names: split_names(&[self.names.value.clone()]),
            description: self.description.value.clone(),
            category: self.category,
            subcategory,
            deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;
    use crate::task::Note;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn typed(form: &mut TaskForm, text: &str) {
        text.chars().for_each(|c| form.handle_char(c));
    }

    #[test]
    fn test_new_form_builds_draft() {
        let mut form = TaskForm::new(Category::Project);
        typed(&mut form, "Print flyers");
        form.next_field();
        typed(&mut form, "Ann, Bo");
        form.next_field();
        form.next_field();
        typed(&mut form, "Outreach");
        form.next_field();
        typed(&mut form, "tomorrow");

        let draft = form.to_draft(today()).unwrap();
        assert_eq!(draft.description, "Print flyers");
        assert_eq!(draft.names, vec!["Ann".to_string(), "Bo".to_string()]);
        assert_eq!(draft.category, Category::Project);
        assert_eq!(draft.subcategory.as_deref(), Some("Outreach"));
        assert_eq!(draft.deadline, NaiveDate::from_ymd_opt(2025, 3, 13));
    }

    #[test]
    fn test_blank_optionals_are_absent_and_bad_deadline_fails() {
        let mut form = TaskForm::new(Category::Robot);
        form.current_field = SUBCATEGORY_FIELD;
        typed(&mut form, "   ");
        let draft = form.to_draft(today()).unwrap();
        assert_eq!(draft.subcategory, None);
        assert_eq!(draft.deadline, None);

        form.current_field = DEADLINE_FIELD;
        typed(&mut form, "someday");
        assert!(form.to_draft(today()).is_err());
    }

    #[test]
    fn test_from_task_round_trips_editable_fields() {
        let created = Utc.timestamp_millis_opt(0).single().unwrap();
        let task = Task {
            id: TaskId::from("42"),
            names: vec!["Ann".into(), "Bo".into()],
            description: "Rebuild gearbox".into(),
            category: Category::Robot,
            subcategory: Some("Drive".into()),
            status: Status::InProgress,
            created_at: created,
            notes: vec![Note { text: "n".into(), date: created }],
            deadline: NaiveDate::from_ymd_opt(2025, 4, 1),
        };
        let form = TaskForm::from_task(&task);
        assert_eq!(form.editing, Some(TaskId::from("42")));
        assert_eq!(form.to_draft(today()).unwrap(), TaskDraft::from_task(&task));
    }

    #[test]
    fn test_category_selector_wraps() {
        let mut form = TaskForm::new(Category::Robot);
        form.current_field = CATEGORY_FIELD;
        form.handle_left();
        assert_eq!(form.category, Category::Other);
        form.handle_right();
        form.handle_right();
        assert_eq!(form.category, Category::Project);
        form.handle_char('x');
        assert!(form.description.value.is_empty());
    }

    #[test]
    fn test_cycle_subcategory_through_registered_names() {
        let registered = vec!["Arm".to_string(), "Drive".to_string()];
        let mut form = TaskForm::new(Category::Robot);
        form.cycle_subcategory(&registered, true);
        assert_eq!(form.subcategory.value, "Arm");
        form.cycle_subcategory(&registered, true);
        assert_eq!(form.subcategory.value, "Drive");
        form.cycle_subcategory(&registered, true);
        assert_eq!(form.subcategory.value, "Arm");
        form.cycle_subcategory(&registered, false);
        assert_eq!(form.subcategory.value, "Drive");
        form.cycle_subcategory(&[], true);
        assert_eq!(form.subcategory.value, "Drive");
    }

    #[test]
    fn test_field_navigation_wraps() {
        let mut form = TaskForm::new(Category::Robot);
        form.prev_field();
        assert_eq!(form.current_field, DEADLINE_FIELD);
        form.next_field();
        assert_eq!(form.current_field, DESCRIPTION_FIELD);
        assert!(form.active_input().is_some());
        form.current_field = CATEGORY_FIELD;
        assert!(form.active_input().is_none());
    }
}
