//! How command results reach stdout: readable text, or JSON with `--json`.

use serde::Serialize;
use tracing::warn;

/// Output mode chosen on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Text,
    Pretty,
    /// Single-line JSON.
    Compact,
}

impl OutputMode {
    /// `--compact` alone is enough to switch to JSON.
    pub fn from_flags(json: bool, compact: bool) -> Self {
        match (json, compact) {
            (_, true) => OutputMode::Compact,
            (true, false) => OutputMode::Pretty,
            (false, false) => OutputMode::Text,
        }
    }

    pub fn is_json(self) -> bool {
        self != OutputMode::Text
    }

    fn to_json<T: Serialize>(self, data: &T) -> serde_json::Result<String> {
        match self {
            OutputMode::Compact => serde_json::to_string(data),
            _ => serde_json::to_string_pretty(data),
        }
    }

    /// Print `data` in JSON modes and `text` otherwise.
    pub fn report<T: Serialize>(self, data: &T, text: &str) {
        if !self.is_json() {
            if !text.is_empty() {
                println!("{}", text);
            }
            return;
        }
        match self.to_json(data) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!(error = %e, "could not serialize result"),
        }
    }

    /// Print a failure. JSON modes write `{"success": false, "error": ...}`
    /// to stdout; text mode writes the message to stderr.
    pub fn fail(self, message: &str) {
        if !self.is_json() {
            eprintln!("{}", message);
            return;
        }
        let report = FailureReport {
            success: false,
            error: message,
        };
        match self.to_json(&report) {
            Ok(json) => println!("{}", json),
            Err(_) => eprintln!("{}", message),
        }
    }
}

#[derive(Serialize)]
struct FailureReport<'a> {
    success: bool,
    error: &'a str,
}
