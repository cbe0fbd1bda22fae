//! PDF report of completed tasks.
//!
//! Export happens in three steps. `Report::from_tasks` captures what is
//! printed for each task, `layout` places every line on A4 pages (millimetres,
//! measured from the top-left corner), and `render_pdf` draws the pages with
//! the built-in Helvetica faces. `export_report` chains them and writes the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Timelike};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use thiserror::Error;

use crate::db::format_deadline;
use crate::task::Task;

/// Status line printed under every entry.
pub const STATUS_MARKER: &str = "COMPLETED";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MM: f32 = 14.0;
const NOTE_LEFT_MM: f32 = 20.0;
const NOTE_WIDTH_MM: f32 = 180.0;
const PAGE_TOP_MM: f32 = 20.0;
const FIRST_ENTRY_MM: f32 = 45.0;
/// An entry starting below this line goes to a fresh page.
const ENTRY_BREAK_MM: f32 = 250.0;
/// No line is placed below this.
const BOTTOM_LIMIT_MM: f32 = 287.0;

const TITLE_PT: f32 = 20.0;
const DATE_PT: f32 = 14.0;
const HEADING_PT: f32 = 12.0;
const BODY_PT: f32 = 10.0;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No completed tasks to export.")]
    NothingToExport,

    #[error("failed to render PDF: {0}")]
    Pdf(String),

    #[error("failed to write report to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything the report prints for one completed task.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub description: String,
    pub assignees: String,
    pub category: String,
    pub deadline: Option<NaiveDate>,
    pub notes: Vec<String>,
}

impl ReportEntry {
    fn from_task(task: &Task) -> Self {
        let category = match task.subcategory.as_deref() {
            Some(sub) => format!("{} - {}", task.category, sub),
            None => task.category.to_string(),
        };
        ReportEntry {
            description: task.description.clone(),
            assignees: task.joined_names(),
            category,
            deadline: task.deadline,
            notes: task.notes.iter().map(|n| n.text.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    /// Build a report from completed tasks, in the order given.
    pub fn from_tasks<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        title: &str,
        generated_at: DateTime<Local>,
    ) -> Result<Report, ReportError> {
        let entries: Vec<ReportEntry> = tasks.into_iter().map(ReportEntry::from_task).collect();
        if entries.is_empty() {
            return Err(ReportError::NothingToExport);
        }
        Ok(Report {
            title: title.to_string(),
            generated_at,
            entries,
        })
    }

    /// Long-form date printed under the title.
    pub fn date_line(&self) -> String {
        self.generated_at.format("%A, %B %-d, %Y").to_string()
    }

    /// `<title> <MM-DD-YYYY> <Morning|Afternoon>.pdf`
    pub fn file_name(&self) -> String {
        let period = if self.generated_at.hour() < 12 { "Morning" } else { "Afternoon" };
        format!("{} {} {}.pdf", self.title, self.generated_at.format("%m-%d-%Y"), period)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// A line of text at a fixed position on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub size_pt: f32,
    pub weight: Weight,
    pub x_mm: f32,
    pub y_mm: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<PlacedLine>,
}

struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = PAGE_TOP_MM;
    }

    fn put(&mut self, text: String, size_pt: f32, weight: Weight, x_mm: f32, advance: f32) {
        if self.y > BOTTOM_LIMIT_MM {
            self.new_page();
        }
        let y_mm = self.y;
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(PlacedLine { text, size_pt, weight, x_mm, y_mm });
        }
        self.y += advance;
    }
}

/// Place every line of the report on A4 pages.
pub fn layout(report: &Report) -> Vec<Page> {
    let mut cur = Cursor { pages: vec![Page::default()], y: PAGE_TOP_MM };

    cur.put(report.title.clone(), TITLE_PT, Weight::Bold, LEFT_MM, 10.0);
    cur.put(report.date_line(), DATE_PT, Weight::Regular, LEFT_MM, 0.0);
    cur.y = FIRST_ENTRY_MM;

    for (index, entry) in report.entries.iter().enumerate() {
        if cur.y > ENTRY_BREAK_MM {
            cur.new_page();
        }
        cur.put(format!("Task {}: {}", index + 1, entry.description), HEADING_PT, Weight::Bold, LEFT_MM, 7.0);
        cur.put(format!("Assigned to: {}", entry.assignees), BODY_PT, Weight::Regular, LEFT_MM, 6.0);
        cur.put(format!("Category: {}", entry.category), BODY_PT, Weight::Regular, LEFT_MM, 6.0);
        if let Some(d) = entry.deadline {
            cur.put(format!("Deadline: {}", format_deadline(d)), BODY_PT, Weight::Regular, LEFT_MM, 6.0);
        }
        if !entry.notes.is_empty() {
            cur.put("Notes:".to_string(), BODY_PT, Weight::Regular, LEFT_MM, 5.0);
            for note in &entry.notes {
                for line in wrap_text(&format!("- {note}"), NOTE_WIDTH_MM, BODY_PT) {
                    cur.put(line, BODY_PT, Weight::Regular, NOTE_LEFT_MM, 5.0);
                }
            }
            cur.y += 3.0;
        }
        cur.put(format!("Status: {STATUS_MARKER}"), BODY_PT, Weight::Regular, LEFT_MM, 10.0);
    }
    cur.pages
}

/// Word-wrap `text` so each line fits `width_mm` at `size_pt`.
pub fn wrap_text(text: &str, width_mm: f32, size_pt: f32) -> Vec<String> {
    let max_chars = ((width_mm / (size_pt * PT_TO_MM * AVG_GLYPH_EM)) as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Draw laid-out pages into a PDF document.
pub fn render_pdf(title: &str, pages: &[Page]) -> Result<Vec<u8>, ReportError> {
    let pdf_err = |e: printpdf::Error| ReportError::Pdf(format!("{e:?}"));

    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;

    let mut first = Some((first_page, first_layer));
    for (n, page) in pages.iter().enumerate() {
        let (page_idx, layer_idx) = match first.take() {
            Some(target) => target,
            None => doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), format!("Layer {}", n + 1)),
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        for line in &page.lines {
            let font = match line.weight {
                Weight::Regular => &regular,
                Weight::Bold => &bold,
            };
            layer.use_text(
                line.text.clone(),
                line.size_pt,
                Mm(line.x_mm),
                Mm(PAGE_HEIGHT_MM - line.y_mm),
                font,
            );
        }
    }
    doc.save_to_bytes().map_err(pdf_err)
}

/// Write a report of `completed` tasks into `out_dir` and return its path.
///
/// Nothing is written when there are no completed tasks.
pub fn export_report(
    completed: &[&Task],
    title: &str,
    out_dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf, ReportError> {
    let report = Report::from_tasks(completed.iter().copied(), title, now)?;
    let pages = layout(&report);
    let bytes = render_pdf(&report.title, &pages)?;

    fs::create_dir_all(out_dir).map_err(|source| ReportError::Io { path: out_dir.to_path_buf(), source })?;
    let path = out_dir.join(report.file_name());
    fs::write(&path, bytes).map_err(|source| ReportError::Io { path: path.clone(), source })?;
    tracing::info!(path = %path.display(), tasks = report.entries.len(), pages = pages.len(), "report exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Category, Status};
    use crate::task::{Note, TaskId};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, hour, 30, 0).single().unwrap()
    }

    fn completed_task(notes: &[&str]) -> Task {
        let created = Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap();
        Task {
            id: TaskId::from("1"),
            names: vec!["Ann".into(), "Bo".into()],
            description: "Rebuild gearbox".into(),
            category: Category::Robot,
            subcategory: Some("Drivetrain".into()),
            status: Status::Completed,
            created_at: created,
            notes: notes.iter().map(|t| Note { text: t.to_string(), date: created }).collect(),
            deadline: NaiveDate::from_ymd_opt(2026, 10, 20),
        }
    }

    fn texts(pages: &[Page]) -> Vec<&str> {
        pages.iter().flat_map(|p| p.lines.iter().map(|l| l.text.as_str())).collect()
    }

    #[test]
    fn test_no_completed_tasks_refuses_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let err = export_report(&[], "Daily Dragon", dir.path(), at(9)).unwrap_err();
        assert!(matches!(err, ReportError::NothingToExport));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_file_name_period_of_day() {
        let task = completed_task(&[]);
        let morning = Report::from_tasks([&task], "Daily Dragon", at(11)).unwrap();
        assert_eq!(morning.file_name(), "Daily Dragon 10-19-2026 Morning.pdf");
        let afternoon = Report::from_tasks([&task], "Daily Dragon", at(12)).unwrap();
        assert_eq!(afternoon.file_name(), "Daily Dragon 10-19-2026 Afternoon.pdf");
        assert_eq!(afternoon.date_line(), "Monday, October 19, 2026");
    }

    #[test]
    fn test_entry_lines_include_notes_in_order() {
        let task = completed_task(&["ordered parts", "installed"]);
        let report = Report::from_tasks([&task], "Daily Dragon", at(9)).unwrap();
        let pages = layout(&report);
        assert_eq!(
            texts(&pages),
            vec![
                "Daily Dragon",
                "Monday, October 19, 2026",
                "Task 1: Rebuild gearbox",
                "Assigned to: Ann, Bo",
                "Category: Robot - Drivetrain",
                "Deadline: 10/20/2026",
                "Notes:",
                "- ordered parts",
                "- installed",
                "Status: COMPLETED",
            ]
        );
        let status = pages[0].lines.last().unwrap();
        // 45 + 7 + 6 + 6 + 6 + 5 + 5 + 5 + 3
        assert_eq!(status.y_mm, 88.0);
    }

    #[test]
    fn test_entries_past_break_line_start_a_new_page() {
        let tasks: Vec<Task> = (0..20).map(|_| completed_task(&[])).collect();
        let report = Report::from_tasks(tasks.iter(), "R", at(9)).unwrap();
        let pages = layout(&report);
        assert!(pages.len() > 1);
        let first_on_second = &pages[1].lines[0];
        assert!(first_on_second.text.starts_with("Task "));
        assert_eq!(first_on_second.y_mm, PAGE_TOP_MM);
        for page in &pages {
            assert!(page.lines.iter().all(|l| l.y_mm <= BOTTOM_LIMIT_MM));
        }
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let long = "word ".repeat(60);
        let lines = wrap_text(&long, NOTE_WIDTH_MM, BODY_PT);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 102));
        assert_eq!(wrap_text("", NOTE_WIDTH_MM, BODY_PT), vec![String::new()]);
        let unbroken = "x".repeat(250);
        assert_eq!(wrap_text(&unbroken, NOTE_WIDTH_MM, BODY_PT).len(), 3);
    }

    #[test]
    fn test_export_writes_pdf() {
        let dir = tempdir().unwrap();
        let task = completed_task(&["one", "two"]);
        let path = export_report(&[&task], "Daily Dragon", dir.path(), at(15)).unwrap();
        assert_eq!(path, dir.path().join("Daily Dragon 10-19-2026 Afternoon.pdf"));
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
