use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("shot {base} has no primary file")]
    NoPrimary { base: PathBuf },

    #[error("shot {base} has more than one primary file")]
    AmbiguousPrimary { base: PathBuf },

    #[error("cannot read metadata of {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("unable to read capture date of {path}")]
    MissingTimestamp { path: PathBuf },

    #[error("cannot find alternate folder for {base}")]
    AlternateExhausted { base: PathBuf },

    #[error("volume probe failed: {0}")]
    VolumeProbe(String),

    #[error("cannot copy to {path}: {reason}")]
    Destination { path: PathBuf, reason: String },

    #[error("unexpected state at {path} after collision check")]
    Collision { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("aborted by user")]
    Aborted,
}

impl ImportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
