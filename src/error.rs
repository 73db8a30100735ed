use std::path::PathBuf;

use crate::record::RecordError;

/// Errors raised while converting a dataset split.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("image {path} has zero {dimension}")]
    ZeroDimension {
        path: String,
        dimension: &'static str,
    },

    #[error("invalid record in {}: {source}", path.display())]
    Record {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    #[error("record in {} is not a valid Example: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: prost::DecodeError,
    },

    #[error("{} holds {found} records, expected {expected}", path.display())]
    VerifyMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
