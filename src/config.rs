//! Configuration management for ra4draw
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Command-line flags override individual fields in the CLI handlers.
//!
//! # Environment Variables
//!
//! - `RA4DRAW_LOG_LEVEL`: Logging level - default: "info"
//! - `RA4DRAW_MAKE`: Build tool program - default: "make"
//! - `RA4DRAW_LATEX`: LaTeX compiler - default: "pdflatex"
//! - `RA4DRAW_SUBMIT`: Batch job submission command - default: "JobSubmit.csh"
//! - `RA4DRAW_JOBS`: Parallel make jobs - default: available parallelism
//! - `RA4DRAW_FRAGMENT`: Generated Makefile fragment name - default: ".subdirs.mk"
//! - `RA4DRAW_VARIABLES_REPO`: Repository holding the shared variables folder
//!
//! # Example
//!
//! ```no_run
//! use ra4draw::Ra4DrawConfig;
//!
//! let config = Ra4DrawConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("make runs with -j{}", config.jobs);
//! ```

use std::env;
use std::thread;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAKE_PROGRAM: &str = "make";
const DEFAULT_LATEX_PROGRAM: &str = "pdflatex";
const DEFAULT_SUBMIT_PROGRAM: &str = "JobSubmit.csh";
const DEFAULT_FRAGMENT_NAME: &str = ".subdirs.mk";
const DEFAULT_VARIABLES_REPO: &str = "git@github.com:manuelfs/babymaker";
const MAX_JOBS: usize = 1024;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Main configuration structure for ra4draw
#[derive(Debug, Clone)]
pub struct Ra4DrawConfig {
    /// Program used to run the generated Makefile
    pub make_program: String,

    /// Program used to compile .tex files
    pub latex_program: String,

    /// Program used to submit batch job scripts
    pub submit_program: String,

    /// Number of parallel make jobs
    pub jobs: usize,

    /// File name of the generated Makefile fragment, relative to the project root
    pub fragment_name: String,

    /// Git URL of the repository carrying the `variables` folder
    pub variables_repo: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Ra4DrawConfig {
    fn default() -> Self {
        let jobs = env::var("RA4DRAW_JOBS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or_else(host_parallelism);

        let log_level = env::var("RA4DRAW_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            make_program: env_or("RA4DRAW_MAKE", DEFAULT_MAKE_PROGRAM),
            latex_program: env_or("RA4DRAW_LATEX", DEFAULT_LATEX_PROGRAM),
            submit_program: env_or("RA4DRAW_SUBMIT", DEFAULT_SUBMIT_PROGRAM),
            jobs,
            fragment_name: env_or("RA4DRAW_FRAGMENT", DEFAULT_FRAGMENT_NAME),
            variables_repo: env_or("RA4DRAW_VARIABLES_REPO", DEFAULT_VARIABLES_REPO),
            log_level,
        }
    }
}

impl Ra4DrawConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` for an empty program name, a job
    /// count outside `1..=1024`, a fragment name containing a path separator or
    /// an unknown log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("make program", &self.make_program),
            ("LaTeX program", &self.latex_program),
            ("submit program", &self.submit_program),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }

        if self.jobs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Job count must be at least 1".to_string(),
            ));
        }
        if self.jobs > MAX_JOBS {
            return Err(ConfigError::ValidationFailed(format!(
                "Job count cannot exceed {}",
                MAX_JOBS
            )));
        }

        if self.fragment_name.is_empty() || self.fragment_name.contains('/') {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid fragment name: '{}'",
                self.fragment_name
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }
}

/// Parses a job count given on the command line, enforcing `1..=1024`
pub fn parse_jobs(value: &str) -> Result<usize, ConfigError> {
    let jobs = value.parse::<usize>().map_err(|e| ConfigError::ParseError {
        field: "jobs".to_string(),
        error: e.to_string(),
    })?;
    if !(1..=MAX_JOBS).contains(&jobs) {
        return Err(ConfigError::ValidationFailed(format!(
            "Job count must be between 1 and {}, got {}",
            MAX_JOBS, jobs
        )));
    }
    Ok(jobs)
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn host_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
