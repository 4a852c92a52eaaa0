//! Error taxonomy for the user service and its supervisor
//!
//! Each subsystem owns a `thiserror` enum; [`AppError`] folds them together
//! for the binary so every failure maps to a category and an exit code.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading the dataset. Always fatal at startup.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate user id {id} in dataset")]
    DuplicateId { id: i64 },
}

/// Outcome of a user lookup that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("user {raw} not found")]
    NotFound { raw: String },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),
    #[error("HTTP server error: {0}")]
    Serve(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to spawn worker for slot {slot}: {source}")]
    Spawn {
        slot: usize,
        #[source]
        source: io::Error,
    },
    #[error("Worker count must be at least 1")]
    NoWorkers,
    #[error("Cannot locate current executable: {0}")]
    CurrentExe(#[source] io::Error),
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] io::Error),
}

/// Top-level error returned by the binary entry point.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Dataset,
    Network,
    Process,
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Dataset => "dataset",
            ErrorCategory::Network => "network",
            ErrorCategory::Process => "process",
            ErrorCategory::Config => "config",
        }
    }
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Service(ServiceError::Dataset(_)) => ErrorCategory::Dataset,
            AppError::Service(ServiceError::InvalidAddress(_)) => ErrorCategory::Config,
            AppError::Service(_) => ErrorCategory::Network,
            AppError::Supervisor(SupervisorError::NoWorkers) => ErrorCategory::Config,
            AppError::Supervisor(_) => ErrorCategory::Process,
            AppError::Config(_) => ErrorCategory::Config,
        }
    }

    /// Process exit code for this failure; never zero.
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::Config => 2,
            ErrorCategory::Dataset => 3,
            ErrorCategory::Network => 4,
            ErrorCategory::Process => 5,
        }
    }
}
