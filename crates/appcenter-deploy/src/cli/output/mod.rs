//! Output formatting utilities

use std::collections::BTreeMap;

use console::style;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Print exported variables, one per line
pub fn outputs(outputs: &BTreeMap<String, String>) {
    println!("{}", header("Outputs"));
    for (key, value) in outputs {
        println!("{}", key_value(key, value));
    }
}
