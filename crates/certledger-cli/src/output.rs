//! Output formatting utilities.

use serde_json::Value;

/// Formats a value as pretty JSON.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Prints a value as pretty JSON on stdout.
pub fn print_json(value: &Value) {
    println!("{}", format_json(value));
}
