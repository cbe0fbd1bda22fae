//! Board TUI entry point and terminal setup.

use std::{io, path::Path};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mockable::DefaultClock;
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::db::TaskStore;
use crate::registry::SubcategoryRegistry;
use crate::storage::FileStore;
use crate::tui::board::BoardApp;

/// Load the tasks and subcategories under `data_dir` and run the board until
/// the user quits.
pub fn run_board_tui(data_dir: &Path, config: &Config) -> io::Result<()> {
    let store = TaskStore::load(FileStore::open(data_dir)?, DefaultClock)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let registry = SubcategoryRegistry::load(FileStore::open(data_dir)?)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut app = BoardApp::new(store, registry, config.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    tracing::info!(dir = %data_dir.display(), "board opened");
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
