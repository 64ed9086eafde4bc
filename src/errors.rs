use thiserror::Error;

/// Crate-wide error type.
///
/// Recoverable per-record problems (an unreadable FASTQ record, a single
/// ambiguous k-mer window) are logged and skipped by the caller; these
/// variants are reserved for failures that abort a stage.
#[derive(Debug, Error)]
pub enum MetaDbgError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("shard {shard} exhausted its capacity")]
    CapacityExhausted { shard: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, MetaDbgError>;
