/// Errors that can occur while decoding a value.
///
/// Every variant carries the byte offset at which decoding stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The input ended in the middle of an item.
    #[error("unexpected end of input at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// Additional information 28..=30 is reserved.
    #[error("invalid length encoding {info} at offset {offset}")]
    InvalidLengthEncoding { info: u8, offset: usize },

    /// Indefinite length used on a major type that forbids it.
    #[error("indefinite length not allowed for major type {major} at offset {offset}")]
    InvalidIndefiniteLength { major: u8, offset: usize },

    /// A chunk inside an indefinite-length string does not match its parent.
    #[error("invalid indefinite length chunk (major type {found}, expected {expected}) at offset {offset}")]
    InvalidChunk { expected: u8, found: u8, offset: usize },

    /// A declared length does not fit in the remaining input.
    #[error("declared length {length} exceeds remaining input at offset {offset}")]
    LengthOverflow { length: u64, offset: usize },

    /// Text string is not valid UTF-8.
    #[error("invalid utf-8 in text string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// Bytes remain after the top-level value.
    #[error("{remaining} trailing bytes after value")]
    TrailingBytes { remaining: usize },

    /// Nesting exceeded the configured depth.
    #[error("nesting deeper than {max_depth} at offset {offset}")]
    DepthLimitExceeded { max_depth: usize, offset: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
