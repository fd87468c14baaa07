//! Shared styling utilities for terminal output.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold).
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Abbreviated object id (yellow).
pub fn short_id(id: &str) -> String {
    let short = id.get(..12).unwrap_or(id);
    Style::new().yellow().apply_to(short).to_string()
}

/// One status line for a path: a colored change letter and the path.
pub fn path_change(kind: char, path: &str) -> String {
    let style = match kind {
        'A' => Style::new().green(),
        'D' => Style::new().red(),
        'C' => Style::new().red().bold(),
        _ => Style::new().yellow(),
    };
    format!("  {} {}", style.apply_to(kind), path)
}
