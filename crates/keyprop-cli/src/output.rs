//! Output formatting utilities for CLI.

use console::style;

/// Prints a key-value pair with consistent formatting.
pub fn print_key_value(key: &str, value: &str) {
    println!("  {:<16}{}", format!("{}:", key), value);
}

/// Prints an optional value, or a dimmed placeholder.
pub fn print_optional(key: &str, value: Option<&str>) {
    match value {
        Some(v) => print_key_value(key, v),
        None => print_key_value(key, &style("(not set)").dim().to_string()),
    }
}

/// Prints a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", style(title).bold().underlined());
}

/// Prints a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Prints an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

/// Prints a warning message.
pub fn print_warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow(), message);
}

/// Prints a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
