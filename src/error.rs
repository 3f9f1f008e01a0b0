//! # Error Handling
//!
//! This module defines the centralized error type for `commonrepo`. It uses
//! the `thiserror` library to create a single `Error` enum covering every
//! failure the target resolution engine can report, plus the handful of
//! ambient failures (configuration loading, git invocation, I/O) raised by
//! the collaborators that feed it.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. The resolution engine itself only ever
//!   produces `InvalidPattern`, `NotFound`, `UpstreamNotFound` and
//!   `CyclicUpstream`; the remaining variants come from configuration
//!   parsing, the git layer and rendering.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Errors are always returned to the caller. Presentation (exit codes,
//! hints, colors) belongs to the binary.

use thiserror::Error;

/// Main error type for commonrepo operations
#[derive(Error, Debug)]
pub enum Error {
    /// A glob pattern or rename expression could not be compiled.
    ///
    /// A pattern that fails to compile never matches anything.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A referenced path does not exist in the repository file view.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// A declared upstream could not be reached or read.
    #[error("Upstream not found: {locator}: {message}")]
    UpstreamNotFound { locator: String, message: String },

    /// Following upstream declarations revisited a locator already in the
    /// chain.
    #[error("Cyclic upstream chain: {cycle}")]
    CyclicUpstream { cycle: String },

    /// An error occurred while parsing a `.commonrepo.yaml` file.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred while executing a git command.
    #[error("Git command failed for {locator}: {command} - {stderr}")]
    GitCommand {
        command: String,
        locator: String,
        stderr: String,
    },

    /// An error occurred while substituting variables into a templated
    /// target.
    #[error("Template processing error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The template variable that caused the error, if applicable
        variable: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an `InvalidPattern` error.
    pub fn invalid_pattern(pattern: &str, message: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a `NotFound` error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound { path: path.into() }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_pattern() {
        let error = Error::invalid_pattern("[abc", "unclosed character class");
        let display = format!("{}", error);
        assert!(display.contains("Invalid pattern"));
        assert!(display.contains("[abc"));
        assert!(display.contains("unclosed character class"));
    }

    #[test]
    fn test_error_display_not_found() {
        let error = Error::not_found("test/doesntexist");
        assert_eq!(format!("{}", error), "Not found: test/doesntexist");
    }

    #[test]
    fn test_error_display_upstream_not_found() {
        let error = Error::UpstreamNotFound {
            locator: "git@github.com:example/missing.git".to_string(),
            message: "repository not found".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Upstream not found"));
        assert!(display.contains("git@github.com:example/missing.git"));
        assert!(display.contains("repository not found"));
    }

    #[test]
    fn test_error_display_cyclic_upstream() {
        let error = Error::CyclicUpstream {
            cycle: "./ -> ../shared -> ./".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Cyclic upstream chain"));
        assert!(display.contains("./ -> ../shared -> ./"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "unknown field `includes`".to_string(),
            hint: Some("Did you mean 'include'?".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("hint:"));
        assert!(display.contains("Did you mean 'include'?"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "ls-remote --symref".to_string(),
            locator: "https://github.com/test/repo.git".to_string(),
            stderr: "Permission denied".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("ls-remote --symref"));
        assert!(display.contains("Permission denied"));
    }

    #[test]
    fn test_error_template_names_variable() {
        let error = Error::Template {
            message: "undefined variable 'project'".to_string(),
            variable: Some("project".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Template processing error: undefined variable 'project' (variable: project)"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let error = Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only output directory",
        ));
        assert!(matches!(error, Error::Io(_)));
        assert!(error.to_string().ends_with("read-only output directory"));
    }
}
