//! Core types: calendar entries, page tokens, tracing setup

pub mod calendar;
pub mod tracing;

pub use calendar::{CalendarEntry, PageToken};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
