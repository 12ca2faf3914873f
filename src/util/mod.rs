//! Utility modules for ra4draw
//!
//! - Structured logging setup and configuration
//! - Absolute path resolution shared by the commands

pub mod logging;
pub mod paths;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
pub use paths::full_path;
