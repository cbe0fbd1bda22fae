//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Category;

/// Used for the Robot column
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Used for the Project column
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for the Other column
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Overdue deadlines
pub const ALERT_RED: Color = Color::Rgb(255, 85, 85);

/// Theme color of a category column.
pub fn category_color(category: Category) -> Color {
    match category {
        Category::Robot => DARK_RED,
        Category::Project => GOLD,
        Category::Other => DARK_GREEN,
    }
}

/// Readable foreground on top of a category color.
pub fn text_on(color: Color) -> Color {
    match color {
        GOLD => Color::Rgb(20, 20, 20),
        _ => Color::White,
    }
}
