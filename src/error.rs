//! Error types for the PDF writer.
//!
//! Every stage of a save propagates failures through [`Error`]. A failed save
//! leaves whatever bytes were already flushed to the sink; discarding them is
//! up to the caller.

/// Result type alias for writer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while writing a PDF.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Output sink failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The crypto handler refused or failed to encrypt a payload
    #[error("Encryption failed for object {obj_num}: {reason}")]
    Encryption {
        /// Object number the payload belongs to
        obj_num: u32,
        /// Reason reported by the handler
        reason: String,
    },

    /// Deflate failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// No object number is left in the 32-bit space
    #[error("Object number space exhausted")]
    ObjectNumberExhausted,

    /// An object was recorded twice in the cross-reference section
    #[error("Duplicate cross-reference entry for object {0}")]
    DuplicateXrefEntry(u32),

    /// An object had to be re-serialized but is not in the document graph
    #[error("Object not found in document: {0} 0 R")]
    MissingObject(u32),

    /// Prior revision bytes or tables are unusable
    #[error("Invalid prior revision: {0}")]
    InvalidPrior(String),

    /// File version outside 1.0 to 1.7
    #[error("Invalid file version: {0} (expected 10..=17)")]
    InvalidVersion(u8),

    /// Creator used out of order
    #[error("Invalid creator state: {0}")]
    InvalidState(String),
}
