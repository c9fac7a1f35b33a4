//! Shared styling utilities for the CLI.

use console::Style;

use idproxy_core::identity::NormalizeOutcome;

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

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Table cell for a normalization outcome.
pub fn outcome_cell(outcome: NormalizeOutcome) -> comfy_table::Cell {
    let cell = comfy_table::Cell::new(outcome.label());
    match outcome {
        NormalizeOutcome::Converted => cell.fg(comfy_table::Color::Green),
        NormalizeOutcome::SkippedNoMatch => cell,
        NormalizeOutcome::SkippedEmpty => cell.fg(comfy_table::Color::Yellow),
    }
}
