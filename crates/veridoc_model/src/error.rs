//! Error types for the text codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding the text format.
///
/// Any of these means the document is malformed; no partial item is ever
/// produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A block marker line was expected but something else was found.
    #[error("line {line}: expected '{expected}' marker")]
    MissingMarker {
        /// The marker that was expected.
        expected: &'static str,
        /// Line number (1-based).
        line: usize,
    },

    /// A `key: value` line could not be parsed.
    #[error("line {line}: malformed line '{content}'")]
    InvalidLine {
        /// Line number (1-based).
        line: usize,
        /// The offending line content.
        content: String,
    },

    /// A required header key was absent.
    #[error("line {line}: missing required key '{key}'")]
    MissingKey {
        /// The absent key.
        key: &'static str,
        /// Line number of the enclosing block (1-based).
        line: usize,
    },

    /// A value did not parse as an item ID.
    #[error("invalid ID for '{key}': '{value}'")]
    InvalidId {
        /// The key the value belongs to.
        key: &'static str,
        /// The offending value.
        value: String,
    },

    /// A value did not parse as a number.
    #[error("invalid number: '{value}'")]
    InvalidNumber {
        /// The offending value.
        value: String,
    },

    /// The document declares an unknown format version.
    #[error("unsupported format version '{found}'")]
    UnsupportedFormatVersion {
        /// The declared format version.
        found: String,
    },

    /// The input ended before a declared value length was satisfied.
    #[error("line {line}: value truncated, expected {expected} bytes")]
    TruncatedValue {
        /// Declared value length in bytes.
        expected: usize,
        /// Line number where the value starts (1-based).
        line: usize,
    },

    /// A field value was not followed by its terminator.
    #[error("line {line}: missing value terminator")]
    MissingTerminator {
        /// Line number (1-based).
        line: usize,
    },

    /// Content appeared where a block marker was expected.
    #[error("line {line}: unexpected content '{content}'")]
    UnexpectedContent {
        /// Line number (1-based).
        line: usize,
        /// The offending content.
        content: String,
    },

    /// A blob value was not valid Base64.
    #[error("invalid Base64 blob: {message}")]
    InvalidBase64 {
        /// Description of the decode failure.
        message: String,
    },
}
