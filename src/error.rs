//! Error types for funz-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using funz-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the Funz tool.
#[derive(Error, Debug)]
pub enum Error {
    /// A buffered tool call failed (non-zero exit, output ceiling exceeded)
    #[error("Funz command failed: {subcommand}: {message}\nStderr: {stderr}")]
    ToolFailed {
        subcommand: String,
        message: String,
        stderr: String,
    },

    /// The streamed simulation run exited unsuccessfully
    #[error("Simulation failed with code {}\n{stderr}", display_code(.code))]
    SimulationFailed { code: Option<i32>, stderr: String },

    /// The interpreter process could not be started
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Subprocess pipe error
    #[error("Subprocess communication error: {0}")]
    SubprocessComm(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error on a specific path
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required input (document, directory, model) was not provided
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The receiving side of an event channel went away
    #[error("Event channel closed")]
    ChannelClosed,
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "null".to_string())
}

impl Error {
    /// Create a tool failure error.
    pub fn tool_failed(
        subcommand: impl Into<String>,
        message: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::ToolFailed {
            subcommand: subcommand.into(),
            message: message.into(),
            stderr: stderr.into(),
        }
    }

    /// Create an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a missing-input error.
    pub fn missing_input(what: impl Into<String>) -> Self {
        Self::MissingInput(what.into())
    }

    /// Whether this error was caused by absent user input rather than a failure.
    ///
    /// Front ends show these as transient notices instead of errors.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingInput(_))
    }

    /// Captured standard error of the failing process, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ToolFailed { stderr, .. } | Self::SimulationFailed { stderr, .. } => {
                Some(stderr)
            }
            _ => None,
        }
    }
}
