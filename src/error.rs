use std::error::Error as StdError;

use crate::ScoreType;

/// Custom Result type for bytescore operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the bytescore library, encompassing all possible error cases
/// that can occur while building, storing, or reading score matrices.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Caller mistakes: wrong builder mode, mutation after build, mismatched dimensions
    #[error("Usage error: {0}")]
    UsageError(#[from] UsageError),

    /// Values outside the valid input range of a codec
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),

    /// Errors related to the on-disk store layout
    #[error("Error processing store: {0}")]
    StoreError(#[from] StoreError),

    /// A taxon or block that is not present in the store
    #[error("Missing data: {0}")]
    MissingDataError(#[from] MissingDataError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error reports absent data rather than a failure
    ///
    /// Callers can treat these as recoverable (e.g. a taxon never written for one score type).
    #[must_use]
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingDataError(_))
    }

    /// Checks if the error is a caller mistake
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::UsageError(_))
    }
}

/// Errors raised when the API is used incorrectly
#[derive(thiserror::Error, Debug)]
pub enum UsageError {
    /// Any call on a builder after `build()` released its storage
    #[error("Builder has already been built - create a new builder to continue")]
    AlreadyBuilt,

    /// An operation that the builder's storage mode does not support
    #[error("Operation `{operation}` is not supported in {mode} mode - {hint}")]
    WrongMode {
        operation: &'static str,
        mode: &'static str,
        hint: &'static str,
    },

    /// A supplied row or array does not match the declared dimension
    #[error("Invalid number of {what}: {actual}. Expected: {expected}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A coordinate outside the matrix extent
    #[error("Requested {axis} index ({index}) is out of range ({len})")]
    OutOfBounds {
        axis: &'static str,
        index: usize,
        len: usize,
    },

    /// A range whose start lies past its end
    #[error("Invalid range: start ({start}) is greater than end ({end})")]
    InvalidRange { start: usize, end: usize },

    /// A translation maps into indices the base matrix does not have
    #[error("Translation maps {axis} index {index} beyond the base extent ({len})")]
    TranslationOutOfRange {
        axis: &'static str,
        index: usize,
        len: usize,
    },

    /// Matrices combined into one score disagree on their dimensions
    #[error(
        "Matrix for {score_type} has dimensions ({num_taxa} x {num_sites}), expected ({expected_taxa} x {expected_sites})"
    )]
    DimensionMismatch {
        score_type: ScoreType,
        num_taxa: usize,
        num_sites: usize,
        expected_taxa: usize,
        expected_sites: usize,
    },

    /// A score type requested from a score object that does not track it
    #[error("Score type {score_type} is not tracked by {context}")]
    UnsupportedScoreType {
        score_type: ScoreType,
        context: &'static str,
    },

    /// The same taxon written twice for one score type
    #[error("Taxon {taxon} was already written for {score_type}")]
    DuplicateTaxon { score_type: ScoreType, taxon: usize },

    /// Two matrices for the same score type combined into one score
    #[error("More than one matrix supplied for {0}")]
    DuplicateScoreType(ScoreType),

    /// Writing to a store whose index has already been written
    #[error("Store has been finalized and no longer accepts writes")]
    StoreFinalized,

    /// Writing to a store that was opened read-only
    #[error("Store was opened read-only")]
    StoreReadOnly,

    /// Invalid store configuration
    #[error("Invalid store configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// Errors raised when a value cannot be represented by a codec
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    /// Probabilities must fall in the closed interval [0, 1]
    #[error("Probability {0} is outside of [0, 1]")]
    ProbabilityOutOfRange(f32),
}

/// Errors specific to the on-disk store layout
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Invalid file header MAGIC found")]
    InvalidFileHeaderMagic,

    #[error("Invalid format version: {0}")]
    InvalidFormatVersion(u8),

    #[error("Invalid block size in file header: {0}")]
    InvalidBlockSize(u64),

    #[error("Invalid index header MAGIC found")]
    InvalidIndexHeaderMagic,

    #[error("Invalid index footer MAGIC found")]
    InvalidIndexFooterMagic,

    /// The file is shorter than its header or index claims
    #[error(
        "Number of bytes in file does not match expectation - possibly truncated at byte pos {0}"
    )]
    FileTruncation(usize),

    /// The decoded index length does not match the index header
    #[error("Index holds {actual} bytes but the header declares {expected}")]
    IndexSizeMismatch { expected: usize, actual: usize },

    #[error("Unknown score type discriminant: {0}")]
    UnknownScoreType(u8),

    /// An index entry that disagrees with the header or the block table
    #[error("Corrupt index entry for taxon {taxon}: {reason}")]
    CorruptDataset { taxon: u64, reason: &'static str },

    /// Datasets of the same score type were written with different allele counts
    #[error("Score type {score_type} mixes allele counts ({expected} and {found})")]
    InconsistentAlleles {
        score_type: ScoreType,
        expected: usize,
        found: usize,
    },

    /// A decompressed block has an unexpected length
    #[error("Block at offset {offset} decoded to {actual} bytes, expected {expected}")]
    CorruptBlock {
        offset: u64,
        expected: usize,
        actual: usize,
    },
}

/// Data that is legitimately absent from a store
#[derive(thiserror::Error, Debug)]
pub enum MissingDataError {
    #[error("No dataset for taxon {taxon} under {score_type}")]
    Taxon { score_type: ScoreType, taxon: usize },

    #[error("No block {block} for taxon {taxon} under {score_type}")]
    Block {
        score_type: ScoreType,
        taxon: usize,
        block: usize,
    },

    #[error("Store contains no datasets for {0}")]
    ScoreType(ScoreType),
}
