// SPDX-License-Identifier: Apache-2.0

/// Error type for ParseBuffer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseBufferError {
    /// Appending would exceed the fixed buffer capacity.
    BufferFull,
}

/// ParseBuffer wraps the caller-owned byte buffer the incremental parser
/// scans.
///
/// Transport chunks are appended at the end; once a key/value pair has been
/// consumed, the processed prefix is compacted out so the buffer only ever
/// holds undelivered input plus at most one pair in flight. That bounds
/// growth to the longest single value.
pub(crate) struct ParseBuffer<'b> {
    buffer: &'b mut [u8],
    len: usize,
}

impl<'b> ParseBuffer<'b> {
    pub fn new(buffer: &'b mut [u8]) -> Self {
        Self { buffer, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The bytes currently held, in arrival order.
    pub fn as_slice(&self) -> &[u8] {
        self.buffer.get(..self.len).unwrap_or(&[])
    }

    /// Append incoming bytes. Fails without side effects when the fixed
    /// capacity would be exceeded.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), ParseBufferError> {
        let end = self
            .len
            .checked_add(bytes.len())
            .ok_or(ParseBufferError::BufferFull)?;
        let dest = self
            .buffer
            .get_mut(self.len..end)
            .ok_or(ParseBufferError::BufferFull)?;
        dest.copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    /// Shift out the first `count` processed bytes, moving the retained
    /// suffix to the front of the buffer.
    pub fn consume(&mut self, count: usize) {
        if count >= self.len {
            self.len = 0;
            return;
        }
        self.buffer.copy_within(count..self.len, 0);
        self.len -= count;
    }

    /// Drop all content.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}
