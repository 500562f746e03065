use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while converting proofs and public inputs to and from their call encodings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A public input does not fit in a 256-bit word.
    #[error("public input{} does not fit in 256 bits (needs {bits} bits)", describe_index(.index))]
    OutOfRange { index: Option<usize>, bits: usize },

    /// A textual or binary artifact could not be decoded.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEncoding(reason.into())
    }

    /// Attaches the position of the offending public input within its sequence.
    pub(crate) fn at_index(self, position: usize) -> Self {
        match self {
            Self::OutOfRange { bits, .. } => Self::OutOfRange {
                index: Some(position),
                bits,
            },
            other => other,
        }
    }
}

fn describe_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" at index {i}"),
        None => String::new(),
    }
}
