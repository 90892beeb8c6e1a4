//! Logging setup shared by the replay binaries.
//!
//! Everything goes to stderr through `tracing-subscriber`, either as
//! human-readable lines or as JSON objects for log shippers. Standard output
//! stays free for command results.

pub mod logging;

pub use logging::{LogFormat, init_logging};
