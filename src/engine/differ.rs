//! Plan display

use colored::Colorize;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

use crate::ui::{self, Mark};

use super::planner::{Action, FieldChange, Plan, PlannedChange};

const KNOWN_AFTER_APPLY: &str = "(known after apply)";

/// One rendered line of a field change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Context(String),
    Removed(String),
    Added(String),
    Changed(String),
}

/// Compact for scalars, pretty-printed for objects and lists
fn format_value(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        _ => value.to_string(),
    }
}

/// Placeholder for a value that depends on objects not created yet
fn unknown(change: &FieldChange) -> String {
    if change.waiting_on.is_empty() {
        return KNOWN_AFTER_APPLY.to_string();
    }
    let targets: Vec<String> = change.waiting_on.iter().map(ToString::to_string).collect();
    format!("(known after {} is created)", targets.join(", "))
}

/// Render one field change as lines
pub fn describe(change: &FieldChange) -> Vec<Line> {
    let field = &change.field;
    let Some(after) = &change.after else {
        let placeholder = unknown(change);
        return vec![match &change.before {
            Some(before) => Line::Changed(format!("{field}: {} → {placeholder}", format_value(before))),
            None => Line::Added(format!("{field} = {placeholder}")),
        }];
    };

    let new = format_value(after);
    let Some(before) = &change.before else {
        return prefixed(field, &new, Line::Added);
    };
    let old = format_value(before);

    if !old.contains('\n') && !new.contains('\n') {
        return vec![Line::Changed(format!("{field}: {old} → {new}"))];
    }

    let mut lines = vec![Line::Context(format!("{field}:"))];
    let diff = TextDiff::from_lines(&old, &new);
    for change in diff.iter_all_changes() {
        let text = format!("  {}", change.value().trim_end_matches('\n'));
        lines.push(match change.tag() {
            ChangeTag::Equal => Line::Context(text),
            ChangeTag::Delete => Line::Removed(text),
            ChangeTag::Insert => Line::Added(text),
        });
    }
    lines
}

fn prefixed(field: &str, value: &str, make: fn(String) -> Line) -> Vec<Line> {
    let mut parts = value.lines();
    let first = parts.next().unwrap_or_default();
    let mut lines = vec![make(format!("{field} = {first}"))];
    lines.extend(parts.map(|part| make(format!("  {part}"))));
    lines
}

fn symbol(action: Action) -> colored::ColoredString {
    match action {
        Action::Create => "+".green(),
        Action::Update => "~".yellow(),
        Action::Delete => "-".red(),
        Action::Recreate => "±".magenta(),
        Action::NoChange => Mark::Unchanged.glyph(),
    }
}

fn print_line(line: &Line) {
    match line {
        Line::Context(text) => println!("│       {}", text.dimmed()),
        Line::Removed(text) => println!("│     {} {}", "-".red(), text.red()),
        Line::Added(text) => println!("│     {} {}", "+".green(), text.green()),
        Line::Changed(text) => println!("│     {} {}", "~".yellow(), text),
    }
}

fn print_entry(entry: &PlannedChange, verbose: bool) {
    let id = entry
        .id
        .as_deref()
        .map(|id| format!(" ({id})"))
        .unwrap_or_default();
    let note = match entry.action {
        Action::Delete => " will be deleted".red().to_string(),
        Action::Recreate => " was deleted outside netform, will be recreated"
            .magenta()
            .to_string(),
        _ => String::new(),
    };
    println!(
        "│   {} {}{}{}",
        symbol(entry.action),
        entry.address.to_string().bold(),
        id.dimmed(),
        note
    );

    let show_fields = verbose || entry.action != Action::Create || entry.changes.len() <= 12;
    if show_fields {
        for change in &entry.changes {
            for line in describe(change) {
                print_line(&line);
            }
        }
    } else {
        println!("│       {}", format!("{} fields", entry.changes.len()).dimmed());
    }
}

/// Print a plan in a user-friendly format
pub fn display_plan(plan: &Plan, verbose: bool) {
    if !plan.has_changes() {
        println!();
        ui::mark(Mark::Success, "No changes. The controller matches the manifest.");
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    let mut current_kind = None;
    for entry in plan.entries.iter().filter(|e| verbose || e.action.is_change()) {
        if current_kind != Some(entry.address.kind) {
            if current_kind.is_some() {
                println!("│");
            }
            println!("│ {}", entry.address.kind.to_string().bold());
            current_kind = Some(entry.address.kind);
        }
        print_entry(entry, verbose);
    }
    println!("│");

    println!("├─────────────────────────────────────────────────────┤");
    println!("│ {}", summary_line(plan));
    println!("└─────────────────────────────────────────────────────┘");
}

/// `Plan: 1 to create, 2 to update, ...`
pub fn summary_line(plan: &Plan) -> String {
    let create = plan.count(Action::Create) + plan.count(Action::Recreate);
    format!(
        "Plan: {} to create, {} to update, {} to delete, {} unchanged",
        create,
        plan.count(Action::Update),
        plan.count(Action::Delete),
        plan.count(Action::NoChange)
    )
}
