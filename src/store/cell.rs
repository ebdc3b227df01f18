//! Cell normalization
//!
//! Every comparison and containment test in the engine goes through these
//! functions, so the sequential path and every shard agree on what a cell
//! "says" as text and as a number.

use serde_json::Value;

/// Lowercased text projection of a cell.
///
/// Missing and null cells project to the empty string.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Numeric projection of a cell.
///
/// Returns `None` for anything that is not a finite number: missing, null,
/// bools, empty or non-numeric strings, and values that overflow to infinity.
pub fn cell_number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };

    parsed.is_finite().then_some(parsed)
}

/// Whether the text contains any alphabetic character
pub fn has_alpha(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

/// Normalizes a search or filter term: trimmed and lowercased
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}
