//! Output styling and layout for the budget tables

use owo_colors::{colors::css, OwoColorize};

/// Width used when output is not a terminal.
const DEFAULT_WIDTH: usize = 100;

/// Below this many columns the table drops to code and total only.
const NARROW_WIDTH: u16 = 60;

/// Whether stdout accepts ANSI colors.
fn color_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

fn terminal_columns() -> Option<u16> {
    terminal_size::terminal_size().map(|(width, _)| width.0)
}

/// Columns available for a table, or a default when stdout is not a terminal.
pub fn output_width() -> usize {
    terminal_columns().map_or(DEFAULT_WIDTH, usize::from)
}

/// Whether the terminal is too narrow for the full table.
pub fn is_narrow() -> bool {
    terminal_columns().is_some_and(|columns| columns < NARROW_WIDTH)
}

/// Cuts `text` to at most `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Success,
    Warning,
    Info,
    Dim,
}

fn paint(text: &str, tone: Tone) -> String {
    if !color_enabled() {
        return text.to_owned();
    }
    match tone {
        Tone::Success => text.fg::<css::Green>().to_string(),
        Tone::Warning => text.fg::<css::Orange>().to_string(),
        Tone::Info => text.fg::<css::LightBlue>().to_string(),
        Tone::Dim => text.dimmed().to_string(),
    }
}

/// Styles report text by meaning. Plain text when colors are unavailable.
pub trait Colorize: AsRef<str> {
    /// Clean results.
    fn success(&self) -> String {
        paint(self.as_ref(), Tone::Success)
    }

    /// Problems: diagnostics, placeholders, failed files.
    fn warning(&self) -> String {
        paint(self.as_ref(), Tone::Warning)
    }

    /// Titles and header rows.
    fn info(&self) -> String {
        paint(self.as_ref(), Tone::Info)
    }

    /// Secondary detail such as paths and rules.
    fn dim(&self) -> String {
        paint(self.as_ref(), Tone::Dim)
    }
}

impl<T: AsRef<str> + ?Sized> Colorize for T {}
