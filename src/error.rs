//! Error types untuk codec
//!
//! Decode dan encode punya error sendiri: decode error lokal ke satu
//! buffer, encode error lokal ke satu record.

use thiserror::Error;

use crate::protocol::ValueType;

/// Errors that can occur while walking an uplink buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// First byte is not an accepted protocol version
    #[error("unsupported protocol version: {0:#04x}")]
    UnsupportedProtocolVersion(u8),

    /// Field tag outside the known value types
    #[error("invalid value type tag {tag:#04x} at offset {offset}")]
    InvalidTypeTag { tag: u8, offset: usize },

    /// Read past the end of the buffer
    #[error("buffer underrun at offset {offset}: needed {needed} bytes, {available} available")]
    BufferUnderrun {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Buffer exceeds the configured hard cap
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },
}

impl DecodeError {
    #[inline]
    pub fn underrun(offset: usize, needed: usize, available: usize) -> Self {
        Self::BufferUnderrun {
            offset,
            needed,
            available,
        }
    }

    #[inline]
    pub fn invalid_tag(tag: u8, offset: usize) -> Self {
        Self::InvalidTypeTag { tag, offset }
    }

    /// A fresh buffer (more serial bytes, next uplink) may decode cleanly.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::BufferUnderrun { .. } | Self::UnsupportedProtocolVersion(_)
        )
    }
}

/// Errors that can occur while building a payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// Command payloads carry exactly one field
    #[error("command carries exactly one field, got {0}")]
    TooManyFields(usize),

    #[error("no field to encode")]
    NoFields,

    /// Measurement names are at most 4 characters
    #[error("name {0:?} longer than 4 characters")]
    NameTooLong(String),

    /// Name contains characters that do not fit one byte
    #[error("invalid name {0:?}")]
    InvalidName(String),

    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Record does not fit in the remaining builder capacity
    #[error("buffer full: record needs {needed} bytes, {available} available")]
    BufferFull { needed: usize, available: usize },

    #[error("value {value} does not fit value type {ty:?}")]
    ValueOutOfRange { ty: ValueType, value: String },

    /// Aggregate without samples has no mean
    #[error("aggregate has no samples")]
    NoSamples,

    #[error("character {0:?} cannot be sent as a single byte")]
    NotLatin1(char),
}

impl EncodeError {
    #[inline]
    pub fn out_of_range(ty: ValueType, value: impl ToString) -> Self {
        Self::ValueOutOfRange {
            ty,
            value: value.to_string(),
        }
    }

    /// The builder is still usable; the caller can flush and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BufferFull { .. })
    }
}
