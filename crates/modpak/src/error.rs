//! Error types for modpak

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for modpak operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for modpak
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[help]
        help: String,
    },

    /// A `.modules` file could not be read, parsed or rewritten
    #[error("Failed to update modules file '{path}': {message}")]
    #[diagnostic(help("Every .modules file under the stage directory must be valid JSON"))]
    Manifest { path: Utf8PathBuf, message: String },

    /// Cook error
    #[error("Cook error: {message}")]
    Cook {
        message: String,
        #[help]
        help: String,
    },

    /// Staging error
    #[error("Stage error: {message}")]
    Stage {
        message: String,
        #[help]
        help: String,
    },

    /// A filesystem operation on a known path failed
    #[error("Failed to {operation} '{path}': {message}")]
    #[diagnostic(help("Check that the path exists and is writable"))]
    Filesystem {
        operation: &'static str,
        path: Utf8PathBuf,
        message: String,
    },

    /// Archive error
    #[error("Failed to archive '{path}': {message}")]
    Archive { path: Utf8PathBuf, message: String },

    /// Deploy error
    #[error("Deploy error: {message}")]
    Deploy {
        message: String,
        #[help]
        help: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a modules file error
    pub fn manifest(path: impl Into<Utf8PathBuf>, message: impl ToString) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a cook error
    pub fn cook(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Cook {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a staging error
    pub fn stage(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Stage {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create an archive error
    pub fn archive(path: impl Into<Utf8PathBuf>, message: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a filesystem error naming the operation and path
    pub fn fs(operation: &'static str, path: impl Into<Utf8PathBuf>, err: impl ToString) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a deploy error
    pub fn deploy(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Deploy {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Whether this error was raised while validating inputs
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
