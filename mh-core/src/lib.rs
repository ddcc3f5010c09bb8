//! MentorHub Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the other MentorHub crates:
//! - Application configuration (database, logging, contact defaults)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Platform path utilities
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::AppConfig;
pub use error::{MhError, MhResult};
pub use logging::init_logging;
pub use platform::Platform;
