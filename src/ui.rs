//! Terminal output helpers

use colored::{ColoredString, Colorize};

/// Status marker printed in front of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Info,
    Success,
    Warn,
    Error,
    Unchanged,
    Skipped,
}

impl Mark {
    pub fn glyph(self) -> ColoredString {
        match self {
            Self::Info => "ℹ".blue(),
            Self::Success => "✓".green(),
            Self::Warn => "⚠".yellow(),
            Self::Error => "✗".red(),
            Self::Unchanged => "○".dimmed(),
            Self::Skipped => "⊘".yellow(),
        }
    }
}

/// Print `msg` behind a status mark, indented under the current section
pub fn mark(mark: Mark, msg: &str) {
    println!("  {} {}", mark.glyph(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", Mark::Info.glyph(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", Mark::Success.glyph(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", Mark::Warn.glyph(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", Mark::Error.glyph(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}
