//! Error types for remapper-config-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HID device communication failure.
    #[error("HID error: {0}")]
    Hid(String),

    /// Device not found during enumeration.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// A frame's stored CRC does not match the one computed over its body.
    #[error("checksum mismatch: frame carries 0x{expected:08X}, computed 0x{computed:08X}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    /// Value does not fit the width (or range) of its field.
    #[error("value out of range: {field} = {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// The transport returned a frame of the wrong size.
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// Configuration document could not be parsed or serialized.
    #[error("document error: {0}")]
    Document(String),

    /// A step of a read or write transaction failed.
    #[error("{step} failed: {source}")]
    Step { step: String, source: Box<Error> },
}

impl Error {
    /// Attach the name of the transaction step that produced this error.
    ///
    /// Errors that already carry a step are returned unchanged.
    pub fn at_step(self, step: impl Into<String>) -> Self {
        match self {
            Error::Step { .. } => self,
            other => Error::Step {
                step: step.into(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, looking through any step annotation.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
