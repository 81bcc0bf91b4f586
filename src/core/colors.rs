//! Unified color system for change visualization.
//!
//! Every place that prints a [`ChangeKind`] goes through this module so the same kind
//! always gets the same color.
//!
//! # Color Scheme
//! - **Modified**: Yellow
//! - **Added**: Green
//! - **Deleted / Missing**: Red
//! - **Untracked**: Cyan
//! - **Conflicting**: Red bold

use crate::core::change::{ChangeEntry, ChangeKind};
use colored::*;

/// Returns a closure that applies the color for `kind` to any text
pub fn get_status_color_style(kind: ChangeKind) -> Box<dyn Fn(&str) -> ColoredString> {
    match kind {
        ChangeKind::Modified => Box::new(|text: &str| text.yellow()),
        ChangeKind::Untracked => Box::new(|text: &str| text.cyan()),
        ChangeKind::Deleted => Box::new(|text: &str| text.red()),
        ChangeKind::Missing => Box::new(|text: &str| text.red()),
        ChangeKind::Added => Box::new(|text: &str| text.green()),
        ChangeKind::Conflicting => Box::new(|text: &str| text.red().bold()),
    }
}

/// Colored status code padded to two columns
pub fn get_aligned_status(kind: ChangeKind) -> ColoredString {
    let color_fn = get_status_color_style(kind);
    let code = kind.as_str();
    match code {
        s if s.len() == 2 => color_fn(code),
        _ => color_fn(&format!("{code} ")),
    }
}

pub fn get_colored_path(kind: ChangeKind, path: &str) -> ColoredString {
    let color_fn = get_status_color_style(kind);
    color_fn(path)
}

/// `[n] ✓ M  path` line used by the status listing
pub fn format_change_line(index: usize, entry: &ChangeEntry) -> String {
    let index_colored = format!("[{index}]").cyan().bold();
    let staged = if entry.staged {
        "✓".green()
    } else {
        " ".normal()
    };
    let path = entry.path.to_string_lossy();
    format!(
        "{index_colored} {staged} {}  {}",
        get_aligned_status(entry.kind),
        get_colored_path(entry.kind, &path)
    )
}
