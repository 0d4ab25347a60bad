//! Error types for the merge engine.
//!
//! Skippable inputs never surface here: they are logged and dropped during
//! reconciliation. Every variant of [`MergeError`] is fatal to a run.

use crate::header::AuxType;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MergeError>;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(
        "{} has no auxiliary fields; merge with lossless disabled to accept it",
        path.display()
    )]
    LosslessPrecondition { path: PathBuf },

    #[error(
        "{} declares auxiliary field {field} as {}, but earlier inputs declare it as {}",
        path.display(),
        found.c_name(),
        merged.c_name()
    )]
    AuxTypeConflict {
        path: PathBuf,
        field: String,
        merged: AuxType,
        found: AuxType,
    },

    #[error("Temporary directory {} is not empty", path.display())]
    WorkspaceNotEmpty { path: PathBuf },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read input {}: {source:#}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot write merged output: {0:#}")]
    Output(#[source] anyhow::Error),

    #[error("Format error: {0:#}")]
    Format(#[from] anyhow::Error),
}

impl MergeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MergeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short category tag, used in log lines and by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            MergeError::Config(_) => "config",
            MergeError::LosslessPrecondition { .. } | MergeError::AuxTypeConflict { .. } => {
                "precondition"
            }
            MergeError::WorkspaceNotEmpty { .. } => "workspace",
            MergeError::Dispatch(_) => "worker",
            MergeError::Io { .. } | MergeError::Input { .. } | MergeError::Output(_) => "io",
            MergeError::Format(_) => "format",
        }
    }
}

/// Failure of a [`crate::dispatch::run`] call.
///
/// A worker that returned an error is reported separately from one that
/// panicked; both abort the whole call.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("worker {worker} failed on item {item}: {source:#}")]
    WorkerFailed {
        worker: usize,
        item: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("worker {worker} terminated abnormally: {message}")]
    WorkerPanicked { worker: usize, message: String },

    #[error("could not build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
