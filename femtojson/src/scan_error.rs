// SPDX-License-Identifier: Apache-2.0

use crate::parse_buffer::ParseBufferError;

/// Outcome of a successful [`PairParser::scan`](crate::PairParser::scan).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A complete `"key":value` pair was found. The key and value span stay
    /// valid until [`consume_pair`](crate::PairParser::consume_pair).
    Pair,
    /// The buffer ran out before a pair completed. Append more bytes with
    /// [`extend`](crate::PairParser::extend) and scan again.
    NeedMore,
    /// The object's closing `}` was reached and consumed; only whitespace
    /// remained after it.
    ObjectEnd,
}

/// Errors that make the current buffer content unrecoverable for the
/// scanner.
///
/// The parser resets its internal tracking before reporting one of these;
/// whether to discard the raw bytes or re-synchronize is the caller's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    /// A byte that cannot start a key was found while seeking one.
    ExpectedKey(u8),
    /// A byte other than `:` was found between a key and its value.
    ExpectedColon(u8),
    /// Non-whitespace bytes remained after the object's closing `}`.
    TrailingData,
    /// An object key exceeded the fixed key accumulator
    /// ([`MAX_KEY_LEN`](crate::MAX_KEY_LEN) bytes).
    KeyTooLong,
    /// An object key was not valid UTF-8.
    InvalidKeyUtf8,
    /// A found pair has not been consumed yet; call
    /// [`consume_pair`](crate::PairParser::consume_pair) first.
    PairPending,
    /// Appending would exceed the parse buffer's fixed capacity.
    BufferFull,
}

impl From<ParseBufferError> for ScanError {
    fn from(err: ParseBufferError) -> Self {
        match err {
            ParseBufferError::BufferFull => ScanError::BufferFull,
        }
    }
}
