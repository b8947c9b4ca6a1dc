// SPDX-License-Identifier: Apache-2.0

use core::fmt;

use crate::depth_stack::{Container, DepthStack};
use crate::write_buffer::WriteBuffer;
use crate::{Sink, WriteError};

/// A streaming JSON generator over a caller-owned fixed buffer.
///
/// Tokens are appended into the buffer and the buffer is flushed through the
/// [`Sink`] whenever it fills, so document size is unbounded while memory use
/// stays at the buffer size plus a few bytes of nesting state. Tokens may
/// straddle flush boundaries; no token is length-limited by the buffer.
///
/// The writer tracks which collections are open (up to
/// [`MAX_DEPTH`](crate::MAX_DEPTH) levels) and where commas belong. Object
/// adders are valid only while the innermost open collection is an object,
/// array adders only while it is an array; everything else reports
/// [`WriteError::InvalidState`].
///
/// # Strings are not escaped
///
/// Keys and string values are copied **verbatim** between the quotes the
/// writer adds. Callers are responsible for pre-escaping `"`, `\` and
/// control characters. This is a deliberate wire-compatibility decision, not
/// an oversight: passing unescaped text produces invalid JSON.
///
/// # Example
///
/// ```rust
/// use femtojson::{SliceSink, StreamWriter};
///
/// let mut out = [0u8; 64];
/// let mut buffer = [0u8; 16];
/// let mut writer = StreamWriter::new_object(&mut buffer, SliceSink::new(&mut out)).unwrap();
/// writer.add_string("device", "ESP32").unwrap();
/// writer.add_int("uptime_sec", 3600).unwrap();
/// writer.end().unwrap();
/// assert_eq!(writer.sink().as_slice(), br#"{"device":"ESP32","uptime_sec":3600}"#);
/// ```
pub struct StreamWriter<'b, S: Sink> {
    buf: WriteBuffer<'b>,
    sink: S,
    open: DepthStack,
    finalized: bool,
}

impl<'b, S: Sink> StreamWriter<'b, S> {
    /// Start a JSON document whose root is an object. Writes the opening `{`.
    ///
    /// Fails with [`WriteError::InvalidParam`] on a zero-capacity buffer.
    pub fn new_object(buffer: &'b mut [u8], sink: S) -> Result<Self, WriteError> {
        Self::init(buffer, sink, Container::Object)
    }

    /// Start a JSON document whose root is an array. Writes the opening `[`.
    ///
    /// Fails with [`WriteError::InvalidParam`] on a zero-capacity buffer.
    pub fn new_array(buffer: &'b mut [u8], sink: S) -> Result<Self, WriteError> {
        Self::init(buffer, sink, Container::Array)
    }

    fn init(buffer: &'b mut [u8], sink: S, root: Container) -> Result<Self, WriteError> {
        if buffer.is_empty() {
            return Err(WriteError::InvalidParam);
        }
        let mut writer = Self {
            buf: WriteBuffer::new(buffer),
            sink,
            open: DepthStack::new(),
            finalized: false,
        };
        writer.write_byte(root.opening_byte())?;
        if !writer.open.push(root) {
            return Err(WriteError::MaxDepth);
        }
        Ok(writer)
    }

    /// Shared access to the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the writer and return the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Number of currently open collections. 0 means finalized.
    pub fn depth(&self) -> usize {
        self.open.depth()
    }

    /// True once the root collection has been closed.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    // ======================================================================
    // Buffered output
    // ======================================================================

    /// Append bytes, auto-flushing whenever the buffer fills. This is the
    /// chunking loop every token goes through: fill to capacity, flush,
    /// continue with the remainder.
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError> {
        if self.buf.is_full() {
            self.flush()?;
        }
        let mut rest = data;
        while !rest.is_empty() {
            let taken = self.buf.push(rest);
            rest = rest.get(taken..).unwrap_or(&[]);
            // Flush a full buffer independent of remaining length
            if self.buf.is_full() {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), WriteError> {
        self.write_bytes(&[byte])
    }

    /// Send buffered bytes to the sink without closing any collection.
    ///
    /// No-op success when nothing is buffered, so this is idempotent after
    /// finalization. On sink failure the buffered bytes stay in place and
    /// the same flush can be retried.
    pub fn flush(&mut self) -> Result<(), WriteError> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.sink
            .send(self.buf.contents())
            .map_err(|_| WriteError::BufferFull)?;
        self.buf.clear();
        Ok(())
    }

    // ======================================================================
    // State checks and separators
    // ======================================================================

    fn require_object(&self) -> Result<(), WriteError> {
        if self.finalized || self.open.top() != Some(Container::Object) {
            return Err(WriteError::InvalidState);
        }
        Ok(())
    }

    fn require_array(&self) -> Result<(), WriteError> {
        if self.finalized || self.open.top() != Some(Container::Array) {
            return Err(WriteError::InvalidState);
        }
        Ok(())
    }

    /// Write a `,` if the current depth already has content, and mark that
    /// the next item will need one. Uniform for object members, array
    /// elements and nested-collection openings.
    fn comma_if_needed(&mut self) -> Result<(), WriteError> {
        if self.open.needs_comma() {
            self.write_byte(b',')?;
        }
        self.open.set_needs_comma();
        Ok(())
    }

    /// Write `"key":`. The key is copied verbatim.
    fn write_key(&mut self, key: &str) -> Result<(), WriteError> {
        self.write_byte(b'"')?;
        self.write_bytes(key.as_bytes())?;
        self.write_bytes(b"\":")
    }

    /// Stream formatted output (number rendering) through the chunking
    /// writer. `fmt::Error` carries no payload, so the real `WriteError` is
    /// parked in the adapter and recovered here.
    fn write_fmt_value(&mut self, args: fmt::Arguments<'_>) -> Result<(), WriteError> {
        struct FmtAdapter<'w, 'b, S: Sink> {
            writer: &'w mut StreamWriter<'b, S>,
            err: Option<WriteError>,
        }

        impl<S: Sink> fmt::Write for FmtAdapter<'_, '_, S> {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                match self.writer.write_bytes(s.as_bytes()) {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        self.err = Some(e);
                        Err(fmt::Error)
                    }
                }
            }
        }

        let mut adapter = FmtAdapter {
            writer: self,
            err: None,
        };
        match fmt::write(&mut adapter, args) {
            Ok(()) => Ok(()),
            Err(_) => Err(adapter.err.unwrap_or(WriteError::InvalidParam)),
        }
    }

    // ======================================================================
    // Add items to the current object
    // ======================================================================

    /// Add `"key":"value"` to the current object.
    ///
    /// Neither key nor value is escaped; see the type-level note.
    pub fn add_string(&mut self, key: &str, value: &str) -> Result<(), WriteError> {
        self.require_object()?;
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_byte(b'"')?;
        self.write_bytes(value.as_bytes())?;
        self.write_byte(b'"')
    }

    /// Add `"key":value` with a base-10 signed integer value.
    pub fn add_int(&mut self, key: &str, value: i64) -> Result<(), WriteError> {
        self.require_object()?;
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_fmt_value(format_args!("{}", value))
    }

    /// Add `"key":value` with fixed 6-decimal-place rendering (`23.450001`
    /// style, not shortest round-trip; consumers may depend on the width).
    pub fn add_float(&mut self, key: &str, value: f32) -> Result<(), WriteError> {
        self.require_object()?;
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_fmt_value(format_args!("{:.6}", value))
    }

    /// Add `"key":value` with a double-precision number, rendered with the
    /// same fixed 6-decimal-place format as [`add_float`](Self::add_float).
    pub fn add_number(&mut self, key: &str, value: f64) -> Result<(), WriteError> {
        self.require_object()?;
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_fmt_value(format_args!("{:.6}", value))
    }

    /// Add `"key":[v0,v1,...]` from a slice of integers. The whole array is
    /// written in one call and does not consume nesting depth.
    pub fn add_int_array(&mut self, key: &str, values: &[i64]) -> Result<(), WriteError> {
        self.require_object()?;
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_byte(b'[')?;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.write_byte(b',')?;
            }
            self.write_fmt_value(format_args!("{}", value))?;
        }
        self.write_byte(b']')
    }

    /// Add `"key":[v0,v1,...]` from a slice of floats, each rendered with
    /// fixed 6-decimal-place precision. Does not consume nesting depth.
    pub fn add_float_array(&mut self, key: &str, values: &[f32]) -> Result<(), WriteError> {
        self.require_object()?;
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_byte(b'[')?;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.write_byte(b',')?;
            }
            self.write_fmt_value(format_args!("{:.6}", value))?;
        }
        self.write_byte(b']')
    }

    /// Add `"key":value` where `value` is pre-serialized JSON, copied
    /// byte-for-byte with no quoting or escaping. Allows splicing an
    /// already-rendered fragment into the stream.
    pub fn add_raw(&mut self, key: &str, value: &str) -> Result<(), WriteError> {
        self.require_object()?;
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_bytes(value.as_bytes())
    }

    /// Open `"key":{` as a nested object. Close it with [`close`](Self::close).
    pub fn begin_object(&mut self, key: &str) -> Result<(), WriteError> {
        self.require_object()?;
        if self.open.is_full() {
            return Err(WriteError::MaxDepth);
        }
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_byte(b'{')?;
        if !self.open.push(Container::Object) {
            return Err(WriteError::MaxDepth);
        }
        Ok(())
    }

    /// Open `"key":[` as a nested array. Close it with [`close`](Self::close).
    pub fn begin_array(&mut self, key: &str) -> Result<(), WriteError> {
        self.require_object()?;
        if self.open.is_full() {
            return Err(WriteError::MaxDepth);
        }
        self.comma_if_needed()?;
        self.write_key(key)?;
        self.write_byte(b'[')?;
        if !self.open.push(Container::Array) {
            return Err(WriteError::MaxDepth);
        }
        Ok(())
    }

    // ======================================================================
    // Add items to the current array
    // ======================================================================

    /// Append a base-10 signed integer to the current array.
    pub fn append_int(&mut self, value: i64) -> Result<(), WriteError> {
        self.require_array()?;
        self.comma_if_needed()?;
        self.write_fmt_value(format_args!("{}", value))
    }

    /// Append a float to the current array, fixed 6-decimal-place rendering.
    pub fn append_float(&mut self, value: f32) -> Result<(), WriteError> {
        self.require_array()?;
        self.comma_if_needed()?;
        self.write_fmt_value(format_args!("{:.6}", value))
    }

    /// Append `"value"` to the current array. The value is not escaped; see
    /// the type-level note.
    pub fn append_string(&mut self, value: &str) -> Result<(), WriteError> {
        self.require_array()?;
        self.comma_if_needed()?;
        self.write_byte(b'"')?;
        self.write_bytes(value.as_bytes())?;
        self.write_byte(b'"')
    }

    /// Open `{` as a nested object element of the current array.
    pub fn append_object(&mut self) -> Result<(), WriteError> {
        self.require_array()?;
        if self.open.is_full() {
            return Err(WriteError::MaxDepth);
        }
        self.comma_if_needed()?;
        self.write_byte(b'{')?;
        if !self.open.push(Container::Object) {
            return Err(WriteError::MaxDepth);
        }
        Ok(())
    }

    /// Open `[` as a nested array element of the current array.
    pub fn append_array(&mut self) -> Result<(), WriteError> {
        self.require_array()?;
        if self.open.is_full() {
            return Err(WriteError::MaxDepth);
        }
        self.comma_if_needed()?;
        self.write_byte(b'[')?;
        if !self.open.push(Container::Array) {
            return Err(WriteError::MaxDepth);
        }
        Ok(())
    }

    // ======================================================================
    // Closing
    // ======================================================================

    /// Close the current collection, writing `}` or `]` as appropriate.
    ///
    /// Closing the root collection finalizes the writer and performs the
    /// final flush. Otherwise the closed collection counts as content for
    /// its parent, so the parent's next item gets a comma.
    ///
    /// If the delimiter cannot be written because a flush failed, the depth
    /// is left unchanged and the exact same `close()` can be retried.
    pub fn close(&mut self) -> Result<(), WriteError> {
        if self.finalized {
            return Err(WriteError::InvalidState);
        }
        let top = self.open.top().ok_or(WriteError::InvalidState)?;

        // Make room first; only pop once the delimiter is actually buffered.
        // A retried close() must not emit the delimiter twice.
        if self.buf.is_full() {
            self.flush()?;
        }
        self.buf.push(&[top.closing_byte()]);
        let _ = self.open.pop();

        if self.open.is_empty() {
            self.finalized = true;
            self.flush()?;
        } else {
            self.open.set_needs_comma();
        }
        Ok(())
    }

    /// Close every open collection and flush the remainder.
    ///
    /// Idempotent once finalized: further calls just flush (a no-op when the
    /// buffer is empty).
    pub fn end(&mut self) -> Result<(), WriteError> {
        if self.finalized {
            return self.flush();
        }
        // The last close finalizes and flushes when depth reaches 0
        while !self.open.is_empty() {
            self.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SliceSink;

    /// Collects every flushed chunk; the concatenation is the document.
    struct VecSink(Vec<u8>);

    impl Sink for VecSink {
        type Error = ();

        fn send(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
            self.0.extend_from_slice(chunk);
            Ok(())
        }
    }

    /// A sink that can be told to refuse sends, for transport-failure tests.
    struct FlakySink {
        delivered: Vec<u8>,
        fail: bool,
    }

    impl Sink for FlakySink {
        type Error = ();

        fn send(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(());
            }
            self.delivered.extend_from_slice(chunk);
            Ok(())
        }
    }

    fn collect<F>(buffer_size: usize, build: F) -> Vec<u8>
    where
        F: FnOnce(&mut StreamWriter<'_, VecSink>),
    {
        let mut buffer = vec![0u8; buffer_size];
        let mut writer = StreamWriter::new_object(&mut buffer, VecSink(Vec::new()))
            .expect("init should succeed");
        build(&mut writer);
        writer.end().expect("end should succeed");
        writer.into_sink().0
    }

    #[test]
    fn flat_object() {
        let out = collect(64, |w| {
            w.add_string("device", "ESP32").unwrap();
            w.add_int("uptime_sec", 3600).unwrap();
        });
        assert_eq!(out, br#"{"device":"ESP32","uptime_sec":3600}"#);
    }

    #[test]
    fn root_array() {
        let mut out = [0u8; 32];
        let mut buffer = [0u8; 8];
        let mut writer =
            StreamWriter::new_array(&mut buffer, SliceSink::new(&mut out)).unwrap();
        writer.append_int(1).unwrap();
        writer.append_int(2).unwrap();
        writer.append_string("x").unwrap();
        writer.end().unwrap();
        assert_eq!(writer.sink().as_slice(), br#"[1,2,"x"]"#);
    }

    #[test]
    fn fixed_precision_floats() {
        let out = collect(64, |w| {
            w.add_float("temperature", 23.45).unwrap();
            w.add_number("ratio", 0.5).unwrap();
        });
        assert_eq!(out, br#"{"temperature":23.450001,"ratio":0.500000}"#);
    }

    #[test]
    fn negative_and_extreme_ints() {
        let out = collect(8, |w| {
            w.add_int("min", i64::MIN).unwrap();
            w.add_int("neg", -7).unwrap();
        });
        assert_eq!(out, br#"{"min":-9223372036854775808,"neg":-7}"#);
    }

    #[test]
    fn int_and_float_arrays() {
        let out = collect(64, |w| {
            w.add_int_array("ids", &[1, -2, 3]).unwrap();
            w.add_float_array("vals", &[1.0, 2.5]).unwrap();
            w.add_int_array("empty", &[]).unwrap();
        });
        assert_eq!(
            out,
            br#"{"ids":[1,-2,3],"vals":[1.000000,2.500000],"empty":[]}"#
        );
    }

    #[test]
    fn raw_values_are_spliced_verbatim() {
        let out = collect(16, |w| {
            w.add_raw("config", r#"{"a":[1,2],"b":null}"#).unwrap();
            w.add_int("after", 1).unwrap();
        });
        assert_eq!(out, br#"{"config":{"a":[1,2],"b":null},"after":1}"#);
    }

    #[test]
    fn nested_collections_and_commas() {
        let out = collect(64, |w| {
            w.begin_object("inner").unwrap();
            w.add_int("a", 1).unwrap();
            w.close().unwrap();
            w.begin_array("list").unwrap();
            w.append_object().unwrap();
            w.add_int("b", 2).unwrap();
            w.close().unwrap();
            w.append_array().unwrap();
            w.append_int(3).unwrap();
            w.close().unwrap();
            w.close().unwrap();
            w.add_int("tail", 4).unwrap();
        });
        assert_eq!(
            out,
            br#"{"inner":{"a":1},"list":[{"b":2},[3]],"tail":4}"#
        );
    }

    #[test]
    fn one_byte_buffer_streams_every_token() {
        // The smallest legal buffer forces a flush per byte; output must be
        // identical to the large-buffer case.
        let small = collect(1, |w| {
            w.add_string("k", "a long value that cannot fit in one byte")
                .unwrap();
            w.add_int("n", 123456789).unwrap();
        });
        let large = collect(1024, |w| {
            w.add_string("k", "a long value that cannot fit in one byte")
                .unwrap();
            w.add_int("n", 123456789).unwrap();
        });
        assert_eq!(small, large);
    }

    #[test]
    fn wrong_collection_kind_is_invalid_state() {
        let mut out = [0u8; 32];
        let mut buffer = [0u8; 16];
        let mut writer =
            StreamWriter::new_object(&mut buffer, SliceSink::new(&mut out)).unwrap();
        assert_eq!(writer.append_int(1), Err(WriteError::InvalidState));
        writer.begin_array("list").unwrap();
        assert_eq!(
            writer.add_string("k", "v"),
            Err(WriteError::InvalidState)
        );
        writer.append_int(1).unwrap();
        writer.end().unwrap();
        assert_eq!(writer.sink().as_slice(), br#"{"list":[1]}"#);
    }

    #[test]
    fn finalized_writer_rejects_content_but_flushes() {
        let mut out = [0u8; 32];
        let mut buffer = [0u8; 16];
        let mut writer =
            StreamWriter::new_object(&mut buffer, SliceSink::new(&mut out)).unwrap();
        writer.add_int("a", 1).unwrap();
        writer.end().unwrap();
        assert!(writer.is_finalized());
        assert_eq!(writer.depth(), 0);

        assert_eq!(writer.add_int("b", 2), Err(WriteError::InvalidState));
        assert_eq!(writer.close(), Err(WriteError::InvalidState));
        assert_eq!(writer.flush(), Ok(()));
        assert_eq!(writer.end(), Ok(()));
        assert_eq!(writer.sink().as_slice(), br#"{"a":1}"#);
    }

    #[test]
    fn max_depth_is_enforced_and_depth_unchanged() {
        let mut out = [0u8; 64];
        let mut buffer = [0u8; 32];
        let mut writer =
            StreamWriter::new_object(&mut buffer, SliceSink::new(&mut out)).unwrap();
        // Root object is depth 1; "n" and six nested arrays reach the limit
        writer.begin_array("n").unwrap();
        for _ in 0..crate::MAX_DEPTH - 2 {
            writer.append_array().unwrap();
        }
        assert_eq!(writer.depth(), crate::MAX_DEPTH);
        assert_eq!(writer.append_array(), Err(WriteError::MaxDepth));
        assert_eq!(writer.append_object(), Err(WriteError::MaxDepth));
        assert_eq!(writer.depth(), crate::MAX_DEPTH);
        writer.end().unwrap();
        assert_eq!(writer.sink().as_slice(), br#"{"n":[[[[[[[]]]]]]]}"#);
    }

    #[test]
    fn begin_at_max_depth_fails_before_writing_anything() {
        let mut out = [0u8; 64];
        let mut buffer = [0u8; 32];
        let mut writer =
            StreamWriter::new_object(&mut buffer, SliceSink::new(&mut out)).unwrap();
        for _ in 0..crate::MAX_DEPTH - 1 {
            writer.begin_object("o").unwrap();
        }
        assert_eq!(writer.begin_object("x"), Err(WriteError::MaxDepth));
        assert_eq!(writer.begin_array("x"), Err(WriteError::MaxDepth));
        writer.end().unwrap();
        // The failed opens left no key or comma behind
        assert_eq!(
            writer.sink().as_slice(),
            br#"{"o":{"o":{"o":{"o":{"o":{"o":{"o":{}}}}}}}}"#
        );
    }

    #[test]
    fn zero_capacity_buffer_is_invalid_param() {
        let mut out = [0u8; 8];
        let mut buffer = [0u8; 0];
        let result = StreamWriter::new_object(&mut buffer, SliceSink::new(&mut out));
        assert!(matches!(result, Err(WriteError::InvalidParam)));
    }

    #[test]
    fn failed_close_preserves_depth_for_retry() {
        // "{" plus the token of add_int("a", 22) fill the 7-byte buffer
        // exactly, so the token's trailing auto-flush is what fails and the
        // buffer is left full with complete content.
        let mut buffer = [0u8; 7];
        let sink = FlakySink {
            delivered: Vec::new(),
            fail: true,
        };
        let mut writer = StreamWriter::new_object(&mut buffer, sink).unwrap();
        assert_eq!(writer.add_int("a", 22), Err(WriteError::BufferFull));

        // Close cannot make room either; no delimiter may be emitted and the
        // depth must be unchanged so the same close can be retried.
        assert_eq!(writer.close(), Err(WriteError::BufferFull));
        assert_eq!(writer.depth(), 1);
        assert!(!writer.is_finalized());

        // Transport recovers; the identical close completes the document.
        writer.sink_mut().fail = false;
        writer.close().unwrap();
        assert!(writer.is_finalized());
        assert_eq!(writer.sink().delivered, br#"{"a":22}"#);
    }

    #[test]
    fn flush_failure_during_finalize_is_retryable_via_end() {
        let mut buffer = [0u8; 32];
        let sink = FlakySink {
            delivered: Vec::new(),
            fail: false,
        };
        let mut writer = StreamWriter::new_object(&mut buffer, sink).unwrap();
        writer.add_int("a", 1).unwrap();

        writer.sink_mut().fail = true;
        assert_eq!(writer.end(), Err(WriteError::BufferFull));
        assert!(writer.is_finalized());

        writer.sink_mut().fail = false;
        writer.end().unwrap();
        assert_eq!(writer.sink().delivered, br#"{"a":1}"#);
    }
}
