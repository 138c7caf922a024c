//! Error types for the blackhole-reduce subsystem

use crate::channel::Channel;
use crate::fingerprint::ContentIdentity;

/// Structural problems found while reading or writing a BLHO container
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The first four bytes are not `BLHO`
    #[error("invalid magic: expected \"BLHO\", got {found:?}")]
    BadMagic {
        /// The bytes found in place of the magic (lossy UTF-8)
        found: String,
    },
    /// The header carries a layout version this reader does not understand
    #[error("unsupported container version: expected {expected}, got {found}")]
    UnsupportedVersion {
        /// Version this reader supports
        expected: u8,
        /// Version found in the header
        found: u8,
    },
    /// The container ended before a section was complete
    #[error("truncated container reading {section}: need {needed} bytes, {available} available")]
    Truncated {
        /// Section being read
        section: &'static str,
        /// Bytes required
        needed: usize,
        /// Bytes left in the input
        available: usize,
    },
    /// A stored block hash is not exactly 32 bytes
    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidHashLength {
        /// Required digest length
        expected: usize,
        /// Length actually available
        actual: usize,
    },
    /// A signed length or count field is negative
    #[error("negative {section} length: {length}")]
    NegativeLength {
        /// Section the length belongs to
        section: &'static str,
        /// Raw value read
        length: i32,
    },
    /// Metadata JSON is unreadable or inconsistent with the header
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    /// Metadata counts disagree with the stored lists
    #[error("{section} count mismatch: expected {expected}, container holds {actual}")]
    CountMismatch {
        /// Section being checked
        section: &'static str,
        /// Count declared by metadata
        expected: usize,
        /// Count actually stored
        actual: usize,
    },
    /// A position map references an index past the end of its hash list
    #[error("{channel} position {position} references index {index}, but only {unique} unique blocks exist")]
    IndexOutOfRange {
        /// Channel of the offending map
        channel: Channel,
        /// Block position in the map
        position: usize,
        /// Index stored at that position
        index: u32,
        /// Length of the channel's hash list
        unique: usize,
    },
    /// Bytes remain after the last position map
    #[error("{0} trailing bytes after position maps")]
    TrailingBytes(usize),
}

/// All errors that can occur while reducing or reconstructing an image
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    /// The source image could not be read or decoded
    #[error("Image decode failed: {0}")]
    Decode(String),
    /// Container layout violation
    #[error("Container format error: {0}")]
    Format(#[from] FormatError),
    /// Forward transform produced a luma value outside 0..=255
    #[error("Transform produced luma {y} outside 0..=255")]
    TransformRange {
        /// The offending luma value
        y: i32,
    },
    /// A block, pixel, or identity broke a structural contract
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Reconstruction could not find the payload for a referenced block
    #[error("Missing {channel} block {identity}")]
    MissingBlock {
        /// Channel of the missing payload
        channel: Channel,
        /// Identity that was looked up
        identity: ContentIdentity,
    },
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for ReduceError {
    fn from(err: image::ImageError) -> Self {
        ReduceError::Decode(err.to_string())
    }
}

/// Result alias for reduction operations
pub type Result<T> = std::result::Result<T, ReduceError>;
