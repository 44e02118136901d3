//! Event data model for the SSH alert pipeline
//!
//! An [`Event`] is built from exactly one matched log line and consumed right
//! away by the formatter. Nothing here is persisted.

mod event_types;

pub use event_types::{Event, EventKind, EventTime, Field};
