// SPDX-License-Identifier: Apache-2.0

//! The output side of the streaming writer.
//!
//! A [`Sink`] receives buffer-sized chunks of the JSON byte stream whenever
//! the writer's buffer fills or is flushed. For production use you'll
//! typically implement the trait for your transport:
//!
//! - **Network**: `impl Sink for TcpStream` or an HTTP chunked-response handle
//! - **UART/Serial**: `impl Sink for SerialPort` in embedded systems
//! - **Custom buffers**: ring buffers, DMA descriptors, etc.
//!
//! Closures work directly via the blanket impl, which mirrors the classic
//! C-callback contract (`false` = transport failure):
//!
//! ```rust
//! use femtojson::StreamWriter;
//!
//! let mut sent = 0usize;
//! let mut buffer = [0u8; 32];
//! let mut writer = StreamWriter::new_object(&mut buffer, |chunk: &[u8]| {
//!     sent += chunk.len();
//!     true
//! })
//! .unwrap();
//! writer.add_int("uptime_sec", 3600).unwrap();
//! writer.end().unwrap();
//! ```

/// Trait for transports that accept flushed chunks of the JSON stream.
pub trait Sink {
    /// The error type returned by failed sends.
    type Error;

    /// Accept one chunk of output.
    ///
    /// # Contract
    /// - Must be synchronous: the chunk is only valid for the duration of the
    ///   call and **MUST NOT** be retained after returning.
    /// - An `Err` is the only signal of transport failure. The writer maps it
    ///   to [`WriteError::BufferFull`](crate::WriteError::BufferFull) and
    ///   leaves the buffered bytes in place so the caller may retry.
    /// - The call may block (e.g. on a real socket write); that blocking is
    ///   inherited by the writer's caller.
    fn send(&mut self, chunk: &[u8]) -> Result<(), Self::Error>;
}

/// C-style callback sinks: any `FnMut(&[u8]) -> bool` closure, where `false`
/// reports transport failure.
impl<F> Sink for F
where
    F: FnMut(&[u8]) -> bool,
{
    type Error = ();

    fn send(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
        if self(chunk) {
            Ok(())
        } else {
            Err(())
        }
    }
}

/// A [`Sink`] that collects flushed chunks into a caller-owned slice.
///
/// Useful on no_std targets and in tests, where the concatenated output
/// stream needs to be inspected after the writer finishes. Sending more
/// bytes than the slice can hold fails, which the writer reports as
/// [`WriteError::BufferFull`](crate::WriteError::BufferFull).
///
/// # Example
///
/// ```rust
/// use femtojson::{SliceSink, StreamWriter};
///
/// let mut out = [0u8; 64];
/// let mut buffer = [0u8; 8];
/// let mut writer = StreamWriter::new_array(&mut buffer, SliceSink::new(&mut out)).unwrap();
/// writer.append_int(1).unwrap();
/// writer.append_int(2).unwrap();
/// writer.end().unwrap();
/// assert_eq!(writer.sink().as_slice(), b"[1,2]");
/// ```
#[derive(Debug)]
pub struct SliceSink<'a> {
    out: &'a mut [u8],
    len: usize,
}

impl<'a> SliceSink<'a> {
    /// Create a sink that appends into `out`.
    pub fn new(out: &'a mut [u8]) -> Self {
        Self { out, len: 0 }
    }

    /// Bytes collected so far.
    pub fn as_slice(&self) -> &[u8] {
        self.out.get(..self.len).unwrap_or(&[])
    }

    /// Number of bytes collected so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing has been collected yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Sink for SliceSink<'_> {
    type Error = ();

    fn send(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
        let end = self.len.checked_add(chunk.len()).ok_or(())?;
        let dest = self.out.get_mut(self.len..end).ok_or(())?;
        dest.copy_from_slice(chunk);
        self.len = end;
        Ok(())
    }
}
