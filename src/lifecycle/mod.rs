//! Lifecycle management.
//!
//! ```text
//! Construction: validate options → load every config → start refresh tasks
//! close():      fire shutdown signal → tasks stop at their next select
//! ```
//!
//! Shutdown is best effort: `close()` does not wait for tasks, so a refresh already in
//! flight may still complete and notify its listener.

pub mod shutdown;

pub use shutdown::Shutdown;
