//! Tracing and logging setup shared by every host of the agenda core.

/// Tracing subscriber configuration (filters, JSON formatting).
pub mod tracing;

pub use self::tracing::{init, init_with_default_filter};
