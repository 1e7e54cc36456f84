use std::fmt;

use thiserror::Error;

/// Closed set of failure categories for parsing, serializing and building
/// structured field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input was empty (or all whitespace) where a value is required.
    EmptyInput,
    /// A character was found where the grammar does not allow it.
    UnexpectedCharacter,
    /// The input ended before a closing `"`, `:` or `)`.
    MissingCharacter,
    /// A number is out of the RFC 8941 integer or decimal range.
    WrongNumber,
    /// A byte sequence does not hold valid base64.
    InvalidBytes,
    /// A typed accessor was applied to a value of a different kind.
    WrongItemClass,
    /// A dictionary or parameter key violates the key grammar.
    InvalidKey,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::EmptyInput => "empty input",
            ErrorKind::UnexpectedCharacter => "unexpected character",
            ErrorKind::MissingCharacter => "missing character",
            ErrorKind::WrongNumber => "wrong number",
            ErrorKind::InvalidBytes => "invalid bytes",
            ErrorKind::WrongItemClass => "wrong item class",
            ErrorKind::InvalidKey => "invalid key",
        };
        f.write_str(name)
    }
}

/// Error raised by the structured field codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
