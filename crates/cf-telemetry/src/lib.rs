//! Logging setup for the chronofile binary.
//!
//! - **Logging**: human-readable or JSON output via `tracing-subscriber`,
//!   filtered by `RUST_LOG`
//! - **Tracing**: per-run operation spans carrying a generated trace id

pub mod logging;
pub mod tracing_setup;
