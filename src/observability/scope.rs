//! ObservationScope for begin/complete logging around a unit of work
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when closed
//! - Logs `{name}_INCOMPLETE` if dropped without being closed

use std::cell::Cell;
use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs begin and end events at INFO
///
/// ```ignore
/// let scope = ObservationScope::with_fields("SHARD_LOAD", &[("shards", "4")]);
/// // ... do work ...
/// scope.complete();
/// ```
///
/// Failure is logged at WARN: every scoped operation in rowview has a
/// sequential fallback.
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    timer: Timer,
}

impl<'a> ObservationScope<'a> {
    /// Logs `{name}_BEGIN`; `fields` are repeated on every line of the scope
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::log(Severity::Info, &format!("{}_BEGIN", name), fields);

        Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
        }
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    /// Logs `{name}_COMPLETE` with the elapsed time
    pub fn complete(self) {
        self.completed.set(true);
        let elapsed = self.timer.elapsed_ms();

        let mut fields = self.field_refs();
        fields.push(("elapsed_ms", elapsed.as_str()));

        Logger::log(Severity::Info, &format!("{}_COMPLETE", self.name), &fields);
    }

    /// Logs `{name}_FAILED` at WARN
    pub fn fail(self, reason: &str) {
        self.completed.set(true);

        let mut fields = self.field_refs();
        fields.push(("reason", reason));

        Logger::warn(&format!("{}_FAILED", self.name), &fields);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            let event = format!("{}_INCOMPLETE", self.name);
            Logger::warn(&event, &[("reason", "scope dropped without completion")]);
        }
    }
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_keeps_fields_as_owned_strings() {
        let shards = String::from("4");
        let scope = ObservationScope::with_fields("TEST", &[("shards", shards.as_str())]);
        drop(shards);

        assert_eq!(scope.field_refs(), vec![("shards", "4")]);
        assert!(!scope.completed.get());
        scope.complete();
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::with_fields("TEST", &[]);
        scope.fail("shard 2 timed out");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::with_fields("TEST", &[("rows", "0")]);
        drop(scope);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let ms: u64 = timer.elapsed_ms().parse().unwrap();
        assert!(ms >= 10);
    }
}
