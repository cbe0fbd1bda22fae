//! # CyberTracker - Team Task Tracker
//!
//! A command-line task tracker for a robotics team, with a category board in the terminal
//! and a printable PDF report of finished work.
//!
//! ## Key Features
//!
//! - **Three Categories**: Robot, Project and Other, each split into user-defined subcategories
//! - **Simple Workflow**: Not Started → In Progress → Completed, one step at a time in either direction
//! - **Stable Ordering**: Tasks grouped by subcategory, open work first, newest first
//! - **Board Interface**: Three-column kanban with notes, deadlines and overdue highlighting
//! - **PDF Reports**: Export every completed task, with assignees and notes, to an A4 report
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! ct add "Rewire the arm encoder" --name Ann --name Bo --category robot --subcategory Arm
//!
//! # Start and finish it
//! ct start "Rewire the arm encoder"
//! ct finish "Rewire the arm encoder"
//!
//! # See everything, grouped
//! ct list
//!
//! # Open the board
//! ct board
//!
//! # Write the report of completed work
//! ct export
//! ```
//!
//! ## Key Commands
//!
//! - `ct board` - Launch the three-column board
//! - `ct add <description>` - Create a task
//! - `ct list` - View tasks per category and subcategory
//! - `ct advance|back <id>` - Move a task through the workflow
//! - `ct note <id> <text>` - Attach a timestamped note
//! - `ct subcategory add <category> <name>` - Register a subcategory
//! - `ct export` - Write the completed-task PDF
//! - `ct backup` - Create timestamped copies of the data files
//!
//! Data is stored locally in `~/.cybertracker/` as `tasks.json` and `subcategories.json`,
//! with optional settings in `config.toml`.

use std::path::{Path, PathBuf};

use clap::Parser;
use mockable::DefaultClock;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod grouping;
pub mod logging;
pub mod registry;
pub mod report;
pub mod storage;
pub mod task;
#[cfg(test)]
mod testing;
pub mod tui {
    pub mod board;
    pub mod board_run;
    pub mod colors;
    pub mod input;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use config::Config;
use db::TaskStore;
use registry::SubcategoryRegistry;
use storage::FileStore;

fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".cybertracker")
    })
}

fn open_store(data_dir: &Path) -> TaskStore<FileStore, DefaultClock> {
    let files = FileStore::open(data_dir).unwrap_or_else(|e| {
        eprintln!("Failed to create data directory {}: {}", data_dir.display(), e);
        std::process::exit(1);
    });
    TaskStore::load(files, DefaultClock).unwrap_or_else(|e| {
        eprintln!("Failed to load tasks: {e}");
        std::process::exit(1);
    })
}

fn open_registry(data_dir: &Path) -> SubcategoryRegistry<FileStore> {
    let files = FileStore::open(data_dir).unwrap_or_else(|e| {
        eprintln!("Failed to create data directory {}: {}", data_dir.display(), e);
        std::process::exit(1);
    });
    SubcategoryRegistry::load(files).unwrap_or_else(|e| {
        eprintln!("Failed to load subcategories: {e}");
        std::process::exit(1);
    })
}

fn main() {
    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir);

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("Failed to create data directory {}: {}", data_dir.display(), e);
        std::process::exit(1);
    }

    // The board owns the terminal, so its logs go to a file.
    if matches!(cli.command, Commands::Board) {
        if let Err(e) = logging::init_file(cli.verbose, &data_dir) {
            eprintln!("Failed to open log file: {e}");
            std::process::exit(1);
        }
    } else {
        logging::init_stderr(cli.verbose);
    }

    let config = Config::load(&data_dir).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    match cli.command {
        Commands::Board => cmd_board(&data_dir, &config),

        Commands::Add { description, names, category, subcategory, deadline } =>
            cmd_add(
                &mut open_store(&data_dir),
                &mut open_registry(&data_dir),
                description,
                names,
                category,
                subcategory,
                deadline,
            ),

        Commands::List { category, hide_completed } =>
            cmd_list(&open_store(&data_dir), category, hide_completed),

        Commands::View { id } => cmd_view(&open_store(&data_dir), id),

        Commands::Advance { id } => cmd_advance(&mut open_store(&data_dir), id),

        Commands::Back { id } => cmd_back(&mut open_store(&data_dir), id),

        Commands::Update {
            id, names, desc, category, subcategory, deadline, clear_subcategory, clear_deadline,
        } => {
            let mut store = open_store(&data_dir);
            let deadline = parse_deadline_or_exit(deadline, store.clock());
            let edits = TaskEdits {
                names,
                description: desc,
                category,
                subcategory,
                deadline,
                clear_subcategory,
                clear_deadline,
            };
            cmd_update(&mut store, &mut open_registry(&data_dir), id, edits)
        },

        Commands::Delete { id, yes } => cmd_delete(&mut open_store(&data_dir), id, yes),

        Commands::Note { id, text } => cmd_note(&mut open_store(&data_dir), id, text),

        Commands::Subcategory { action } => cmd_subcategory(&mut open_registry(&data_dir), action),

        Commands::Export { output_dir } => cmd_export(&open_store(&data_dir), &config, output_dir),

        Commands::Backup => {
            let store = open_store(&data_dir);
            cmd_backup(store.storage(), store.clock())
        },

        Commands::Completions { shell } => cmd_completions(shell),
    }
}
