use std::fmt;

use proof_codec::CodecError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error types for a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The external proving tool failed; its output is carried verbatim.
    #[error("prover failed: {0}")]
    Prover(String),

    #[error("missing required configuration value `{0}`")]
    MissingConfig(&'static str),

    #[error("invalid configuration value `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The endpoint was unreachable, answered with a transport-level error, or timed out.
    #[error("network error: {0}")]
    Network(String),

    /// The verifier call reverted on chain.
    #[error("verifier call reverted: {0}")]
    Revert(String),

    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Codec(CodecError::OutOfRange { .. }) => ErrorKind::OutOfRange,
            Self::Codec(CodecError::MalformedEncoding(_)) => ErrorKind::MalformedEncoding,
            Self::Prover(_) => ErrorKind::Prover,
            Self::MissingConfig(_) => ErrorKind::MissingConfig,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Self::Network(_) => ErrorKind::Network,
            Self::Revert(_) => ErrorKind::Revert,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// ErrorKind is the serializable discriminant of a [`PipelineError`], recorded in run results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    OutOfRange,
    MalformedEncoding,
    Prover,
    MissingConfig,
    InvalidConfig,
    Network,
    Revert,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OutOfRange => "OutOfRangeError",
            Self::MalformedEncoding => "MalformedEncodingError",
            Self::Prover => "ProverError",
            Self::MissingConfig => "MissingConfigError",
            Self::InvalidConfig => "InvalidConfigError",
            Self::Network => "NetworkError",
            Self::Revert => "RevertError",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}
