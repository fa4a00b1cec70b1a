//! Error types for kubectl assertions

use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The message carries the captured output: it is what gets displayed when
    /// a test fails, and the log alone rarely tells intended failures apart.
    #[error("Error: {status}\nOutput: {output}")]
    CommandFailed { status: ExitStatus, output: String },

    #[error("Command {command} succeeded but should have failed\nOutput: {output}")]
    UnexpectedSuccess { command: String, output: String },

    #[error("{diagnostic}\nCommand: {command}")]
    AssertionFailed { command: String, diagnostic: String },

    #[error("Temp manifest error: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl E2eError {
    /// Whether the failure can go away on its own if the command is re-run.
    ///
    /// A non-zero exit can be transient (API server still starting, resource
    /// not yet reconciled). A program that cannot be launched will not become
    /// launchable between poll cycles.
    pub fn is_retryable(&self) -> bool {
        matches!(self, E2eError::CommandFailed { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
