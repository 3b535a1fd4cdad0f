//! # Error Handling
//!
//! Centralized error type for pkg-mirror, built with `thiserror`. The
//! taxonomy mirrors the failure modes of the pipeline:
//!
//! - **`Config`**: a module section is missing a required key, or a
//!   template placeholder has no value. Fatal for the module before any
//!   mutation happens.
//! - **`VersionParse`**: a tag or describe string does not have the
//!   expected structure. Per-tag failures are logged and skipped by the
//!   tag parser; a malformed describe output is fatal for the module.
//! - **`GitCommand`**: an underlying git invocation exited non-zero.
//!   Fatal for the current module; the pipeline continues with the rest.
//! - **`Render`**: the template engine rejected a template (syntax
//!   error, undefined variable). Fatal for the module, nothing is
//!   committed.
//! - **`RemoteReconcile`**: the hosting-service repository could not be
//!   looked up or created within the attempt budget. The module is
//!   skipped entirely.
//!
//! Wrapper variants (`Io`, `Ini`, `Http`) carry errors from the
//! supporting crates across the same `Result` alias.

use thiserror::Error;

/// Main error type for pkg-mirror operations
#[derive(Error, Debug)]
pub enum Error {
    /// A module configuration is invalid or incomplete.
    ///
    /// Includes an optional hint describing how to fix the entry.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A version string could not be parsed into a structured version.
    #[error("Version parse error for {input:?}: {message}")]
    VersionParse { input: String, message: String },

    /// A git invocation exited non-zero.
    #[error("Git command failed in {dir}: git {command} - {stderr}")]
    GitCommand {
        command: String,
        dir: String,
        stderr: String,
    },

    /// The template engine failed to render a template.
    #[error("Template render error for {path}: {message}")]
    Render { path: String, message: String },

    /// The remote repository could not be reconciled within the attempt
    /// budget.
    #[error("Remote reconcile error for {repo}: {message}")]
    RemoteReconcile { repo: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An INI parsing error, wrapped from `ini::Error`.
    #[error("INI parsing error: {0}")]
    Ini(#[from] ini::Error),

    /// An HTTP error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a `Config` error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let error = Error::config("missing key 'contents' in [serv]");
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("missing key 'contents'"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_with_hint() {
        let error = Error::Config {
            message: "module 'serv' has no upstream source".to_string(),
            hint: Some("set 'src' or record 'git_describe' and 'git_hash'".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("hint:"));
        assert!(display.contains("set 'src'"));
    }

    #[test]
    fn test_error_display_version_parse() {
        let error = Error::VersionParse {
            input: "1.2.3.dev1".to_string(),
            message: "unstructured suffix".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Version parse error"));
        assert!(display.contains("1.2.3.dev1"));
        assert!(display.contains("unstructured suffix"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "subtree pull -P lib/serv".to_string(),
            dir: "repos/pkg-data-fpga-serv".to_string(),
            stderr: "fatal: refusing to merge unrelated histories".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("subtree pull"));
        assert!(display.contains("unrelated histories"));
    }

    #[test]
    fn test_error_display_render() {
        let error = Error::Render {
            path: "templates/setup.py.jinja".to_string(),
            message: "undefined value".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Template render error"));
        assert!(display.contains("templates/setup.py.jinja"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }
}
