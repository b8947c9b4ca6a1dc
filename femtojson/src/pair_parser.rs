// SPDX-License-Identifier: Apache-2.0

use log::{error, warn};

use crate::parse_buffer::ParseBuffer;
use crate::{Scan, ScanError};

/// Capacity of the key accumulator, in bytes.
pub const MAX_KEY_LEN: usize = 64;

/// Scanner position within one `"key":value` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingKey,
    InKey,
    SeekingColon,
    SeekingValue,
    InValue,
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

/// Incremental extractor of top-level `"key":value` pairs from a streamed
/// byte buffer.
///
/// The parser does not build a tree and does not decode values; it finds
/// pair *boundaries*. Quoting, escapes and nested brace/bracket balance are
/// tracked so a `,` or `}` inside a string or nested value never ends a pair.
/// The returned value span is the raw text, quotes included for string
/// values, covering a whole nested object or array when the value is one.
///
/// Feed transport chunks with [`extend`](Self::extend) and call
/// [`scan`](Self::scan) until it reports [`Scan::Pair`]; then read
/// [`key`](Self::key) / [`value`](Self::value) and release the pair with
/// [`consume_pair`](Self::consume_pair), which compacts the processed prefix
/// out of the buffer. [`Scan::NeedMore`] means the buffer ran out mid-pair:
/// append more bytes and scan again.
///
/// # Example
///
/// ```rust
/// use femtojson::{PairParser, Scan};
///
/// let mut buffer = [0u8; 64];
/// let mut parser = PairParser::new(&mut buffer);
/// parser.extend(br#"{"a":1,"b":"x,y"}"#).unwrap();
///
/// assert_eq!(parser.scan(), Ok(Scan::Pair));
/// assert_eq!(parser.pair(), Some(("a", &b"1"[..])));
/// parser.consume_pair();
///
/// assert_eq!(parser.scan(), Ok(Scan::Pair));
/// assert_eq!(parser.pair(), Some(("b", &br#""x,y""#[..])));
/// parser.consume_pair();
///
/// assert_eq!(parser.scan(), Ok(Scan::NeedMore));
/// ```
pub struct PairParser<'b> {
    buf: ParseBuffer<'b>,
    state: ScanState,
    key: [u8; MAX_KEY_LEN],
    key_len: usize,
    /// Escape pending inside the key (`\"` must not end it).
    key_escape: bool,
    /// The single leading `{` has been skipped this scan pass.
    saw_open_brace: bool,
    in_quotes: bool,
    escape_next: bool,
    /// Nesting of `{}` within the value currently being scanned.
    brace_depth: i32,
    /// Nesting of `[]` within the value currently being scanned.
    bracket_depth: i32,
    value_start: usize,
    value_len: usize,
    /// A found pair is waiting for `consume_pair`.
    have_pair: bool,
}

impl<'b> PairParser<'b> {
    /// Create a parser over a caller-owned, initially empty buffer.
    pub fn new(buffer: &'b mut [u8]) -> Self {
        Self {
            buf: ParseBuffer::new(buffer),
            state: ScanState::SeekingKey,
            key: [0; MAX_KEY_LEN],
            key_len: 0,
            key_escape: false,
            saw_open_brace: false,
            in_quotes: false,
            escape_next: false,
            brace_depth: 0,
            bracket_depth: 0,
            value_start: 0,
            value_len: 0,
            have_pair: false,
        }
    }

    /// Append incoming bytes to the parse buffer.
    ///
    /// Fails with [`ScanError::BufferFull`] when the fixed capacity would be
    /// exceeded, leaving existing content intact.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), ScanError> {
        self.buf.extend(bytes)?;
        Ok(())
    }

    /// Number of bytes currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Capacity of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Forget all buffered bytes and tracking state, ready for a new JSON
    /// message.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.have_pair = false;
        self.reset_tracking();
    }

    /// Scan the buffered bytes for one complete `"key":value` pair.
    ///
    /// On [`Scan::Pair`] the key and value are available through
    /// [`key`](Self::key) / [`value`](Self::value) / [`pair`](Self::pair)
    /// until [`consume_pair`](Self::consume_pair) is called. A scan that
    /// ends [`Scan::NeedMore`] rewinds its tracking, so the next call
    /// re-scans the retained bytes from the start.
    ///
    /// Errors reset the tracking state; the buffered bytes are kept, and
    /// deciding whether to [`reset`](Self::reset) or re-synchronize is up to
    /// the caller.
    pub fn scan(&mut self) -> Result<Scan, ScanError> {
        if self.have_pair {
            error!("scan called while a found pair is still pending");
            return Err(ScanError::PairPending);
        }
        debug_assert_eq!(self.state, ScanState::SeekingKey);

        let mut i = 0;
        while i < self.buf.len() {
            let byte = match self.buf.as_slice().get(i) {
                Some(&b) => b,
                None => break,
            };

            match self.state {
                ScanState::SeekingKey => {
                    if byte == b'"' {
                        self.state = ScanState::InKey;
                    } else if byte == b'}' {
                        // End of the object: consume through the brace, then
                        // nothing but whitespace may remain.
                        self.buf.consume(i.wrapping_add(1));
                        self.reset_tracking();
                        if !self.remaining_is_whitespace() {
                            error!("non-whitespace data after object end");
                            return Err(ScanError::TrailingData);
                        }
                        return Ok(Scan::ObjectEnd);
                    } else if byte == b'{' && !self.saw_open_brace {
                        self.saw_open_brace = true;
                    } else if !is_whitespace(byte) {
                        error!("unexpected byte {:#04x} while seeking key", byte);
                        self.reset_tracking();
                        return Err(ScanError::ExpectedKey(byte));
                    }
                }

                ScanState::InKey => {
                    if self.key_escape {
                        // The escaped byte is stored literally, quote included
                        self.key_escape = false;
                        self.push_key_byte(byte)?;
                    } else if byte == b'\\' {
                        self.key_escape = true;
                    } else if byte == b'"' {
                        if core::str::from_utf8(self.key_bytes()).is_err() {
                            error!("object key is not valid UTF-8");
                            self.reset_tracking();
                            return Err(ScanError::InvalidKeyUtf8);
                        }
                        self.state = ScanState::SeekingColon;
                    } else {
                        self.push_key_byte(byte)?;
                    }
                }

                ScanState::SeekingColon => {
                    if byte == b':' {
                        self.state = ScanState::SeekingValue;
                    } else if !is_whitespace(byte) {
                        error!(
                            "unexpected byte {:#04x} after key, seeking colon",
                            byte
                        );
                        self.reset_tracking();
                        return Err(ScanError::ExpectedColon(byte));
                    }
                }

                ScanState::SeekingValue => {
                    if !is_whitespace(byte) {
                        self.state = ScanState::InValue;
                        self.value_start = i;
                        match byte {
                            b'"' => self.in_quotes = true,
                            b'{' => self.brace_depth = 1,
                            b'[' => self.bracket_depth = 1,
                            _ => {}
                        }
                    }
                }

                ScanState::InValue => {
                    if self.escape_next {
                        // Escaped byte is literal text, whatever it is
                        self.escape_next = false;
                    } else if byte == b'\\' && self.in_quotes {
                        self.escape_next = true;
                    } else {
                        if byte == b'"' {
                            self.in_quotes = !self.in_quotes;
                        }
                        if !self.in_quotes {
                            // Complete once nesting is balanced and a
                            // delimiter shows up outside any quotes
                            if self.brace_depth == 0
                                && self.bracket_depth == 0
                                && (byte == b',' || byte == b'}')
                            {
                                self.value_len = i.wrapping_sub(self.value_start);
                                self.have_pair = true;
                                return Ok(Scan::Pair);
                            }
                            match byte {
                                b'{' => self.brace_depth += 1,
                                b'}' => self.brace_depth -= 1,
                                b'[' => self.bracket_depth += 1,
                                b']' => self.bracket_depth -= 1,
                                _ => {}
                            }
                        }
                    }
                }
            }

            i = i.wrapping_add(1);
        }

        // Buffer exhausted mid-pair. Rewind so the next scan starts cleanly
        // over the retained bytes once the caller has appended more.
        self.reset_tracking();
        Ok(Scan::NeedMore)
    }

    /// The key of the found pair. Empty unless a pair is pending.
    pub fn key(&self) -> &str {
        if !self.have_pair {
            return "";
        }
        core::str::from_utf8(self.key_bytes()).unwrap_or("")
    }

    /// The raw value span of the found pair, within the parse buffer.
    /// Empty unless a pair is pending.
    pub fn value(&self) -> &[u8] {
        if !self.have_pair {
            return &[];
        }
        self.buf
            .as_slice()
            .get(self.value_start..self.value_start.wrapping_add(self.value_len))
            .unwrap_or(&[])
    }

    /// Key and value of the found pair, if one is pending.
    pub fn pair(&self) -> Option<(&str, &[u8])> {
        if self.have_pair {
            Some((self.key(), self.value()))
        } else {
            None
        }
    }

    /// Release the found pair: compact the consumed prefix (through the
    /// trailing delimiter) out of the buffer and reset value tracking, so
    /// the next [`scan`](Self::scan) starts cleanly at the following key.
    pub fn consume_pair(&mut self) {
        if !self.have_pair {
            error!("consume_pair called without a pending pair");
            return;
        }
        // +1 for the `,` or `}` delimiter that ended the pair
        let shift = self
            .value_start
            .wrapping_add(self.value_len)
            .wrapping_add(1);
        self.buf.consume(shift);
        self.have_pair = false;
        self.reset_tracking();
    }

    fn key_bytes(&self) -> &[u8] {
        self.key.get(..self.key_len).unwrap_or(&[])
    }

    fn push_key_byte(&mut self, byte: u8) -> Result<(), ScanError> {
        if let Some(slot) = self.key.get_mut(self.key_len) {
            *slot = byte;
            self.key_len = self.key_len.wrapping_add(1);
            Ok(())
        } else {
            warn!("object key exceeds {} bytes", MAX_KEY_LEN);
            self.reset_tracking();
            Err(ScanError::KeyTooLong)
        }
    }

    fn remaining_is_whitespace(&self) -> bool {
        self.buf.as_slice().iter().all(|&b| is_whitespace(b))
    }

    /// Back to `SeekingKey` with all per-pair tracking cleared. The buffer
    /// and any pending pair flag are left alone.
    fn reset_tracking(&mut self) {
        self.state = ScanState::SeekingKey;
        self.key_len = 0;
        self.key_escape = false;
        self.saw_open_brace = false;
        self.in_quotes = false;
        self.escape_next = false;
        self.brace_depth = 0;
        self.bracket_depth = 0;
        self.value_start = 0;
        self.value_len = 0;
    }
}
