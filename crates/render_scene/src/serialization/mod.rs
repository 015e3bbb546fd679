//! Scene serialization codecs
//!
//! Two formats are provided:
//! - [`binary`]: little-endian stream used to save and load whole scenes
//! - [`record`]: named-field records used for per-entity undo/redo and
//!   property copy, serializable to RON text

pub mod binary;
pub mod record;

pub use binary::{BinaryReader, BinaryWriter};
pub use record::{ComponentRecord, PropertyValue, RecordReader};

use thiserror::Error;

/// Errors raised while reading or writing serialized scene data
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Underlying stream failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream ended early or contained impossible values
    #[error("Corrupted data: {0}")]
    CorruptData(String),

    /// Structured record named an unknown component kind
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// Data written by a newer scene version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(i32),

    /// Structured record could not be converted to or from text
    #[error("Text format error: {0}")]
    Text(String),
}

/// Result alias for serialization
pub type Result<T> = std::result::Result<T, SerializationError>;
