use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed sample record or dataset.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// Invalid architecture dimensions or hyperparameters.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Dimension mismatch in a linear-algebra or loss operation.
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    /// Malformed or incomplete persisted model document.
    #[error("persistence: {0}")]
    Persistence(String),
    /// CSV encoding failure while writing a sample set.
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
