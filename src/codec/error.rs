use thiserror::Error;

/// Everything that can go wrong while encoding or decoding packets.
///
/// Application level failures (e.g. a socket that could not be opened) are *not* protocol errors,
///  they travel in-band as regular message content.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ProtocolError {
    #[error("value {value} is out of range for {field_type} (0..={max})")]
    Range {
        field_type: &'static str,
        value: i128,
        max: u64,
    },

    #[error("truncated input: need {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        needed: usize,
        remaining: usize,
    },

    #[error("invalid encoding: {reason}")]
    InvalidEncoding {
        reason: String,
    },

    #[error("required field {schema}.{field} is not set")]
    MissingRequiredField {
        schema: &'static str,
        field: &'static str,
    },

    #[error("no packet type registered for {identifier:?} version {version:?}")]
    UnknownPacketType {
        identifier: String,
        version: String,
    },

    #[error("{schema} has no field {field:?}")]
    UnknownField {
        schema: &'static str,
        field: String,
    },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl ProtocolError {
    pub fn invalid_encoding(reason: impl Into<String>) -> ProtocolError {
        ProtocolError::InvalidEncoding { reason: reason.into() }
    }

    /// A truncated input is not necessarily broken: on a stream, more bytes may still arrive.
    pub fn is_truncated(&self) -> bool {
        matches!(self, ProtocolError::TruncatedInput { .. })
    }
}
