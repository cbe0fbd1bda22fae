//! Command implementations for the CLI interface.
//!
//! This module contains the subcommand definitions and the handlers that turn
//! them into task store and registry operations, plus the report export,
//! backup and board launch commands.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use mockable::Clock;

use crate::config::Config;
use crate::db::*;
use crate::error::TrackerError;
use crate::fields::*;
use crate::grouping::buckets;
use crate::registry::SubcategoryRegistry;
use crate::report::{export_report, ReportError};
use crate::storage::{FileStore, KeyValueStore};
use crate::task::{Task, TaskDraft, TaskId};
use crate::tui::board_run::run_board_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the category board interface.
    Board,

    /// Add a new task.
    Add {
        /// What needs doing.
        description: String,
        /// Assignee. May be repeated or comma-separated.
        #[arg(long = "name", short = 'n')]
        names: Vec<String>,
        /// Category: robot | project | other.
        #[arg(long, short, value_enum)]
        category: Category,
        /// Subcategory within the category.
        #[arg(long, short)]
        subcategory: Option<String>,
        /// Deadline: YYYY-MM-DD, "today", "tomorrow", "fri", or "in Nd".
        #[arg(long, short)]
        deadline: Option<String>,
    },

    /// List tasks per category, grouped by subcategory.
    List {
        /// Only show this category.
        #[arg(long, short, value_enum)]
        category: Option<Category>,
        /// Leave completed tasks out.
        #[arg(long)]
        hide_completed: bool,
    },

    /// View a single task by ID or description.
    View {
        /// Task ID, ID suffix or description.
        id: String,
    },

    /// Move a task forward (not started -> in progress -> completed).
    #[command(visible_aliases = ["start", "finish"])]
    Advance {
        /// Task ID, ID suffix or description.
        id: String,
    },

    /// Move a task back one step.
    Back {
        /// Task ID, ID suffix or description.
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task ID, ID suffix or description.
        id: String,
        /// Replace the assignees. May be repeated or comma-separated.
        #[arg(long = "name", short = 'n')]
        names: Vec<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, short, value_enum)]
        category: Option<Category>,
        #[arg(long, short)]
        subcategory: Option<String>,
        #[arg(long, short)]
        deadline: Option<String>,
        /// Remove the subcategory.
        #[arg(long, conflicts_with = "subcategory")]
        clear_subcategory: bool,
        /// Remove the deadline.
        #[arg(long, conflicts_with = "deadline")]
        clear_deadline: bool,
    },

    /// Delete a task.
    Delete {
        /// Task ID, ID suffix or description.
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Add a note to a task.
    Note {
        /// Task ID, ID suffix or description.
        id: String,
        /// Note text.
        text: String,
    },

    /// Manage the subcategories offered for each category.
    Subcategory {
        #[command(subcommand)]
        action: SubcategoryAction,
    },

    /// Export completed tasks to a PDF report.
    Export {
        /// Directory to write the report to (default: config export_dir or current directory).
        #[arg(long, short)]
        output_dir: Option<PathBuf>,
    },

    /// Create timestamped copies of the data files.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SubcategoryAction {
    /// Register a new subcategory.
    Add {
        #[arg(value_enum)]
        category: Category,
        name: String,
    },
    /// List registered subcategories.
    List {
        #[arg(value_enum)]
        category: Option<Category>,
    },
}

/// Field overrides collected from `update` flags.
#[derive(Debug, Default)]
pub struct TaskEdits {
    pub names: Vec<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub clear_subcategory: bool,
    pub clear_deadline: bool,
}

impl TaskEdits {
    /// The full set of editable fields after applying these edits to `task`.
    pub fn apply(self, task: &Task) -> TaskDraft {
        let mut draft = TaskDraft::from_task(task);
        let names = split_names(&self.names);
        if !names.is_empty() {
            draft.names = names;
        }
        if let Some(desc) = self.description {
            draft.description = desc;
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if self.clear_subcategory {
            draft.subcategory = None;
        } else if let Some(sub) = self.subcategory {
            draft.subcategory = Some(sub);
        }
        if self.clear_deadline {
            draft.deadline = None;
        } else if let Some(d) = self.deadline {
            draft.deadline = Some(d);
        }
        draft
    }
}

fn exit_with(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

fn report_store_error(e: TrackerError) -> ! {
    match e {
        TrackerError::Validation(v) => exit_with(v),
        TrackerError::Storage(s) => exit_with(format!("Failed to save tasks: {s}")),
    }
}

fn resolve_or_exit(id: &str, tasks: &[Task]) -> TaskId {
    resolve_task_identifier(id, tasks).unwrap_or_else(|e| exit_with(e))
}

/// Add the subcategory a task was saved with to the registry, if it is new.
pub fn register_used_subcategory<R: KeyValueStore>(registry: &mut SubcategoryRegistry<R>, task: &Task) {
    let Some(sub) = task.subcategory.as_deref() else { return };
    match registry.register(task.category, sub) {
        Ok(true) => println!("Registered new subcategory '{sub}' under {}", task.category),
        Ok(false) => {}
        Err(e) => eprintln!("Warning: failed to save subcategories: {e}"),
    }
}

/// Parse an optional deadline argument, exiting on input that is not understood.
pub fn parse_deadline_or_exit<C: Clock>(input: Option<String>, clock: &C) -> Option<NaiveDate> {
    input.map(|s| {
        parse_due_input(&s, local_today(clock)).unwrap_or_else(|| {
            exit_with("Unrecognised deadline. Use YYYY-MM-DD, 'today', 'tomorrow', a weekday, or 'in Nd'.")
        })
    })
}

/// Launch the board interface.
pub fn cmd_board(data_dir: &Path, config: &Config) {
    if let Err(e) = run_board_tui(data_dir, config) {
        exit_with(format!("Board error: {e}"));
    }
}

/// Add a new task.
pub fn cmd_add<S: KeyValueStore, C: Clock, R: KeyValueStore>(
    store: &mut TaskStore<S, C>,
    registry: &mut SubcategoryRegistry<R>,
    description: String,
    names: Vec<String>,
    category: Category,
    subcategory: Option<String>,
    deadline: Option<String>,
) {
    let deadline = parse_deadline_or_exit(deadline, store.clock());
    let mut draft = TaskDraft::new(split_names(&names), description, category);
    draft.subcategory = subcategory;
    draft.deadline = deadline;

    match store.create(draft) {
        Ok(task) => {
            println!("Added task {}", task.id);
            register_used_subcategory(registry, &task);
        }
        Err(e) => report_store_error(e),
    }
}

/// List tasks per category in display order.
pub fn cmd_list<S: KeyValueStore, C: Clock>(
    store: &TaskStore<S, C>,
    category: Option<Category>,
    hide_completed: bool,
) {
    let today = local_today(store.clock());
    let categories: Vec<Category> = match category {
        Some(c) => vec![c],
        None => Category::ALL.to_vec(),
    };

    for (i, category) in categories.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("== {category} ==");
        let groups = buckets(store.tasks(), category);
        if groups.is_empty() {
            println!("No tasks yet");
            continue;
        }
        for bucket in groups {
            let rows: Vec<&Task> = bucket
                .tasks
                .into_iter()
                .filter(|t| !(hide_completed && t.status.is_completed()))
                .collect();
            if rows.is_empty() {
                continue;
            }
            println!("-- {} --", bucket.label);
            print_table(&rows, today);
        }
    }
}

/// Show every field of a task, including its notes.
pub fn cmd_view<S: KeyValueStore, C: Clock>(store: &TaskStore<S, C>, id: String) {
    let task_id = resolve_or_exit(&id, store.tasks());
    let Some(task) = store.get(&task_id) else {
        exit_with(format!("Task {task_id} not found."));
    };
    let today = local_today(store.clock());

    println!("ID:           {}", task.id);
    println!("Description:  {}", task.description);
    println!("Assigned to:  {}", task.joined_names());
    println!("Category:     {}", task.category);
    println!("Subcategory:  {}", task.subcategory.as_deref().unwrap_or("-"));
    println!("Status:       {}", format_status(task.status));
    match task.deadline {
        Some(d) => {
            let overdue = if task.is_overdue(today) { "  OVERDUE" } else { "" };
            println!("Deadline:     {d} ({}){overdue}", format_due_relative(Some(d), today));
        }
        None => println!("Deadline:     -"),
    }
    println!("Created:      {}", task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    if task.notes.is_empty() {
        println!("Notes:        -");
    } else {
        println!("Notes:");
        for note in &task.notes {
            println!("  [{}] {}", note.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"), note.text);
        }
    }
}

/// Move a task forward one step.
pub fn cmd_advance<S: KeyValueStore, C: Clock>(store: &mut TaskStore<S, C>, id: String) {
    let task_id = resolve_or_exit(&id, store.tasks());
    match store.advance(&task_id) {
        Ok(Some(status)) => println!("Task {task_id} is now {}", format_status(status)),
        Ok(None) => println!("Task {task_id} is already completed."),
        Err(e) => report_store_error(e),
    }
}

/// Move a task back one step.
pub fn cmd_back<S: KeyValueStore, C: Clock>(store: &mut TaskStore<S, C>, id: String) {
    let task_id = resolve_or_exit(&id, store.tasks());
    match store.retreat(&task_id) {
        Ok(Some(status)) => println!("Task {task_id} is now {}", format_status(status)),
        Ok(None) => println!("Task {task_id} has not been started."),
        Err(e) => report_store_error(e),
    }
}

/// Update fields on a task, keeping whatever was not specified.
pub fn cmd_update<S: KeyValueStore, C: Clock, R: KeyValueStore>(
    store: &mut TaskStore<S, C>,
    registry: &mut SubcategoryRegistry<R>,
    id: String,
    edits: TaskEdits,
) {
    let task_id = resolve_or_exit(&id, store.tasks());
    let Some(task) = store.get(&task_id) else {
        exit_with(format!("Task {task_id} not found."));
    };
    let draft = edits.apply(task);
    match store.update(&task_id, draft) {
        Ok(true) => {
            println!("Updated task {task_id}");
            if let Some(task) = store.get(&task_id) {
                register_used_subcategory(registry, task);
            }
        }
        Ok(false) => exit_with(format!("Task {task_id} not found.")),
        Err(e) => report_store_error(e),
    }
}

/// Delete a task after confirmation.
pub fn cmd_delete<S: KeyValueStore, C: Clock>(store: &mut TaskStore<S, C>, id: String, yes: bool) {
    let task_id = resolve_or_exit(&id, store.tasks());
    if !yes {
        let description = store.get(&task_id).map(|t| t.description.clone()).unwrap_or_default();
        print!("Are you sure you want to delete task {task_id} ({description})? (y/N): ");
        let _ = io::stdout().flush();
        let mut response = String::new();
        if io::stdin().read_line(&mut response).is_err() || !response.trim().to_lowercase().starts_with('y') {
            println!("Delete cancelled.");
            return;
        }
    }
    match store.remove(&task_id) {
        Ok(Some(_)) => println!("Deleted."),
        Ok(None) => exit_with(format!("Task {task_id} not found.")),
        Err(e) => report_store_error(e),
    }
}

/// Append a note to a task.
pub fn cmd_note<S: KeyValueStore, C: Clock>(store: &mut TaskStore<S, C>, id: String, text: String) {
    let task_id = resolve_or_exit(&id, store.tasks());
    match store.append_note(&task_id, &text) {
        Ok(true) => println!("Note added to {task_id}"),
        Ok(false) => println!("Empty note ignored."),
        Err(e) => report_store_error(e),
    }
}

/// Register or list subcategories.
pub fn cmd_subcategory<S: KeyValueStore>(registry: &mut SubcategoryRegistry<S>, action: SubcategoryAction) {
    match action {
        SubcategoryAction::Add { category, name } => match registry.register(category, &name) {
            Ok(true) => println!("Added subcategory '{}' to {category}", name.trim()),
            Ok(false) => println!("Subcategory '{}' not added (blank or already exists).", name.trim()),
            Err(e) => exit_with(format!("Failed to save subcategories: {e}")),
        },
        SubcategoryAction::List { category } => {
            let categories: Vec<Category> = match category {
                Some(c) => vec![c],
                None => Category::ALL.to_vec(),
            };
            println!("{:<10} {}", "Category", "Subcategories");
            for c in categories {
                let subs = registry.subcategories(c);
                let listed = if subs.is_empty() { "-".to_string() } else { subs.join(", ") };
                println!("{:<10} {}", c.as_str(), listed);
            }
        }
    }
}

/// Export completed tasks to a PDF report.
pub fn cmd_export<S: KeyValueStore, C: Clock>(store: &TaskStore<S, C>, config: &Config, output_dir: Option<PathBuf>) {
    let out_dir = output_dir
        .or_else(|| config.export_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    match export_report(&store.completed(), &config.report_title, &out_dir, store.clock().local()) {
        Ok(path) => println!("Exported report to {}", path.display()),
        Err(ReportError::NothingToExport) => exit_with("No completed tasks to export."),
        Err(e) => exit_with(e),
    }
}

/// Copy every existing record file into `<data_dir>/backup/<timestamp>_<file>`.
pub fn create_backup<C: Clock>(store: &FileStore, clock: &C) -> Result<Vec<PathBuf>, io::Error> {
    let files = store.record_files();
    if files.is_empty() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "No data files to back up"));
    }

    let backup_dir = store.dir().join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = clock.local().format("%Y-%m-%d_%H-%M-%S");
    let mut written = Vec::new();
    for file in files {
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("record.json");
        let backup_path = backup_dir.join(format!("{timestamp}_{file_name}"));
        fs::copy(&file, &backup_path)?;
        written.push(backup_path);
    }
    Ok(written)
}

/// Create timestamped backups of the data files.
pub fn cmd_backup<C: Clock>(store: &FileStore, clock: &C) {
    match create_backup(store, clock) {
        Ok(paths) => {
            for path in paths {
                println!("Backup created: {}", path.display());
            }
        }
        Err(e) => exit_with(format!("Failed to create backup: {e}")),
    }
}

/// Print a shell completion script.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut io::stdout());
}
