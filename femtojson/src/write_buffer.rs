// SPDX-License-Identifier: Apache-2.0

/// WriteBuffer wraps the caller-owned output buffer for the streaming writer.
///
/// It only does byte bookkeeping: copy in what fits, hand out the filled
/// region for a flush, reset. Transport interaction (when to flush, what a
/// failed flush means) lives in the writer.
pub(crate) struct WriteBuffer<'b> {
    buffer: &'b mut [u8],
    used: usize,
}

impl<'b> WriteBuffer<'b> {
    pub fn new(buffer: &'b mut [u8]) -> Self {
        Self { buffer, used: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn is_full(&self) -> bool {
        self.used == self.buffer.len()
    }

    /// Copy as many bytes of `data` as fit and return how many were taken.
    /// Returns 0 when the buffer is full.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let available = self.buffer.len().saturating_sub(self.used);
        let take = data.len().min(available);
        if take > 0 {
            if let (Some(dest), Some(src)) = (
                self.buffer.get_mut(self.used..self.used.wrapping_add(take)),
                data.get(..take),
            ) {
                dest.copy_from_slice(src);
            }
            self.used = self.used.wrapping_add(take);
        }
        take
    }

    /// The filled region, for handing to the sink.
    pub fn contents(&self) -> &[u8] {
        self.buffer.get(..self.used).unwrap_or(&[])
    }

    /// Discard the filled region after a successful flush.
    pub fn clear(&mut self) {
        self.used = 0;
    }
}
