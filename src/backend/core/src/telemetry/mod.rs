//! Telemetry: structured logging infrastructure.

pub mod logging;

pub use logging::{init, LogFormat, LoggingConfig};
