//! Diagnostic report rendering
//!
//! Turns a [`Diagnostics`] collector into the plain log-file text and a
//! terminal rendering with ANSI colors from crossterm.

use crossterm::style::{Color, Stylize};
use drawschema::{Diagnostic, Diagnostics, Severity};

/// Plain report text, one diagnostic line per line
pub fn plain_report(diagnostics: &Diagnostics) -> String {
    let mut text = diagnostics.lines().join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Report text with colors applied per line
///
/// - Section headers: bold cyan
/// - Error lines: red
/// - Planned additions (`+` detail lines): green
/// - Other detail lines: dark grey
pub fn colorize_report(diagnostics: &Diagnostics) -> String {
    let mut result = String::new();
    for diagnostic in diagnostics.entries() {
        for (index, line) in diagnostic.lines().into_iter().enumerate() {
            let colored = if index == 0 {
                colorize_headline(diagnostic, line)
            } else {
                colorize_detail(line)
            };
            result.push_str(&colored);
            result.push('\n');
        }
    }
    result
}

fn colorize_headline(diagnostic: &Diagnostic, line: String) -> String {
    match (diagnostic.kind, diagnostic.severity) {
        (None, _) => format!("{}", line.with(Color::Cyan).bold()),
        (_, Severity::Error) => format!("{}", line.with(Color::Red)),
        (_, Severity::Info) => line,
    }
}

fn colorize_detail(line: String) -> String {
    if line.trim_start().starts_with('+') {
        format!("{}", line.with(Color::Green))
    } else {
        format!("{}", line.with(Color::DarkGrey))
    }
}
