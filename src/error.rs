//! Error taxonomy for decoding, configuration, and the convenience I/O paths.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MidiError {
    /// Bad chunk magic or a wrong declared header length. Aborts the parse.
    #[error("format error at offset {offset}: {message}")]
    Format { offset: usize, message: String },

    /// A read ran past the end of the buffer. Recovered per track by the decoder.
    #[error("truncated input at offset {offset}")]
    TruncatedInput { offset: usize },

    /// Tempo or time signature meta event with an impossible payload length.
    #[error("malformed meta event at offset {offset}: {message}")]
    MalformedMetaEvent { offset: usize, message: String },

    #[error("unknown event status 0x{status:02X} at offset {offset}")]
    UnknownEvent { offset: usize, status: u8 },

    /// Rejected at construction (key signature, time signature, options).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MidiError {
    pub(crate) fn format(offset: usize, message: impl Into<String>) -> Self {
        MidiError::Format { offset, message: message.into() }
    }

    /// Only truncation is recoverable; every other decode failure is fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MidiError::TruncatedInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, MidiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_truncation_is_recoverable() {
        assert!(MidiError::TruncatedInput { offset: 3 }.is_recoverable());
        assert!(!MidiError::format(0, "Doesn't start with MThd").is_recoverable());
        assert!(!MidiError::UnknownEvent { offset: 9, status: 0xF4 }.is_recoverable());
    }

    #[test]
    fn messages_carry_offsets() {
        let err = MidiError::UnknownEvent { offset: 22, status: 0xF4 };
        assert_eq!(err.to_string(), "unknown event status 0xF4 at offset 22");
    }
}
