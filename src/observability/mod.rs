//! Observability for fieldmodel
//!
//! - Structured logging (JSON lines)
//! - Typed events with fixed severities
//! - Engine counters
//!
//! Observability is read-only: it never changes how a model resolves.
//!
//! ```ignore
//! use fieldmodel::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ModelRegistered, &[("model", "Person")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{EngineMetrics, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
