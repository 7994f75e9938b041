//! Error Types - Hard Failures Only
//!
//! Missing outputs and unresolvable locations are `None`, never an error.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Undefined document output {0:?}")]
    OutputNotFound(String),

    #[error("Malformed tag: {0}")]
    MalformedTag(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Unable to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
