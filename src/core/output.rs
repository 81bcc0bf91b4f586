//! Terminal presentation for command results and engine notifications.
//!
//! Every message is built by a `format_*` function and written by its `print_*`
//! counterpart, so the layout can be checked without capturing stdout. Errors are red,
//! successes carry a green check mark, and timestamps are dimmed.

use crate::core::events::{LogLevel, LogLine};
use colored::*;

/// Blank line, `✕ Error: <message>`, blank line
pub fn format_error(message: &str) -> String {
    format!("\n{} {}\n", "✕ Error:".red(), message.white())
}

pub fn format_success(message: &str) -> String {
    format!("\n{} {}", "✓".green(), message.white())
}

pub fn format_section_header(header: &str) -> String {
    format!("\n{}:\n", header.white())
}

/// `HH:MM:SS message`, red for errors
pub fn format_log_line(line: &LogLine) -> String {
    let time = line.at.format("%H:%M:%S").to_string();
    let message = match line.level {
        LogLevel::Info => line.message.white(),
        LogLevel::Error => line.message.red(),
    };
    format!("{} {}", time.bright_black(), message)
}

pub fn print_error(message: &str) {
    println!("{}", format_error(message));
}

pub fn print_success(message: &str) {
    println!("{}", format_success(message));
}

pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

pub fn print_section_header(header: &str) {
    println!("{}", format_section_header(header));
}

pub fn print_log_line(line: &LogLine) {
    println!("{}", format_log_line(line));
}
