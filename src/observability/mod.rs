//! Observability for rowview
//!
//! - Structured logging (one JSON object per line)
//! - Typed lifecycle events
//! - Lock-free counters
//!
//! # Principles
//!
//! 1. Observability is read-only: nothing here changes a result
//! 2. Deterministic output ordering
//! 3. No background threads
//!
//! # Usage
//!
//! ```ignore
//! use rowview::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::RowsIngested, &[("rows", "42")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_views_served();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
