//! 错误类型
//!
//! Every fallible library call returns [`Result`]. The variants fall into three
//! broad kinds (see [`ErrorKind`]): input that could not be ingested, data that
//! violates a structural invariant, and lookups of names or columns that do not
//! exist.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlnError>;

/// Coarse classification of an [`AlnError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Ingestion,
    Validation,
    Lookup,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlnError {
    /// Empty containers and empty text never make a collection.
    #[error("cannot build sequences from empty input")]
    EmptyInput,
    #[error("unrecognized input: {0}")]
    Unrecognized(String),
    #[error("malformed FASTA input: {0}")]
    Fasta(String),

    #[error("duplicate sequence name '{0}'")]
    DuplicateName(String),
    #[error("sequence '{name}' has length {len}, expected {expected}")]
    Ragged { name: String, len: usize, expected: usize },
    #[error("symbol '{symbol}' is not valid for {moltype}")]
    InvalidSymbol { symbol: char, moltype: &'static str },
    #[error("length mismatch: {0}")]
    LengthMismatch(String),
    #[error("pad length {pad_length} is shorter than the longest sequence ({longest})")]
    PadTooShort { pad_length: usize, longest: usize },
    #[error("reference mismatch: {0}")]
    ReferenceMismatch(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no sequence named '{0}'")]
    UnknownName(String),
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

impl AlnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AlnError::EmptyInput | AlnError::Unrecognized(_) | AlnError::Fasta(_) => ErrorKind::Ingestion,
            AlnError::UnknownName(_) | AlnError::IndexOutOfRange { .. } => ErrorKind::Lookup,
            _ => ErrorKind::Validation,
        }
    }
}
