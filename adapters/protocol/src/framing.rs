//! Message framings shared by the socket and pipe bindings.

use std::io::{self, BufRead, ErrorKind, Read, Write};

use crate::TransportError;

/// Largest frame accepted by default, in bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Bidirectional message channel carrying one JSON payload per message.
pub trait Transport {
    /// Blocks until a complete message arrives.
    fn read_message(&mut self) -> Result<String, TransportError>;

    /// Writes one message and flushes it to the peer.
    fn write_message(&mut self, payload: &str) -> Result<(), TransportError>;
}

/// Frames prefixed with a 4-byte big-endian payload length.
#[derive(Debug)]
pub struct LengthPrefixed<S> {
    stream: S,
    max_frame_len: usize,
}

impl<S> LengthPrefixed<S> {
    /// Wraps a stream with the default frame size limit.
    pub fn new(stream: S) -> Self {
        Self::with_max_frame_len(stream, DEFAULT_MAX_FRAME_LEN)
    }

    /// Wraps a stream, rejecting frames longer than `max_frame_len`.
    pub fn with_max_frame_len(stream: S, max_frame_len: usize) -> Self {
        Self {
            stream,
            max_frame_len,
        }
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Transport for LengthPrefixed<S> {
    fn read_message(&mut self) -> Result<String, TransportError> {
        let mut header = [0_u8; 4];
        let received = fill(&mut self.stream, &mut header)?;
        if received == 0 {
            return Err(TransportError::PeerClosed);
        }
        if received < header.len() {
            return Err(TransportError::ShortRead {
                expected: header.len(),
                received,
            });
        }

        let declared = u32::from_be_bytes(header);
        let len = usize::try_from(declared)
            .map_err(|_| TransportError::MalformedFrame(format!("length {declared} overflows")))?;
        if len == 0 {
            return Err(TransportError::MalformedFrame("zero-length frame".into()));
        }
        if len > self.max_frame_len {
            return Err(TransportError::MalformedFrame(format!(
                "frame of {len} bytes exceeds limit of {}",
                self.max_frame_len
            )));
        }

        let mut body = vec![0_u8; len];
        let received = fill(&mut self.stream, &mut body)?;
        if received < len {
            return Err(TransportError::ShortRead {
                expected: len,
                received,
            });
        }

        String::from_utf8(body)
            .map_err(|error| TransportError::MalformedFrame(format!("payload is not UTF-8: {error}")))
    }

    fn write_message(&mut self, payload: &str) -> Result<(), TransportError> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            TransportError::MalformedFrame(format!(
                "payload of {} bytes does not fit a frame header",
                payload.len()
            ))
        })?;
        self.stream.write_all(&len.to_be_bytes())?;
        self.stream.write_all(payload.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }
}

/// One message per newline-terminated line.
#[derive(Debug)]
pub struct LineDelimited<R, W> {
    reader: R,
    writer: W,
    line: Vec<u8>,
    max_line_len: usize,
}

impl<R, W> LineDelimited<R, W> {
    /// Pairs a buffered reader with a writer, using the default size limit.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_max_line_len(reader, writer, DEFAULT_MAX_FRAME_LEN)
    }

    /// Pairs a buffered reader with a writer, rejecting lines longer than
    /// `max_line_len` bytes, terminator excluded.
    pub fn with_max_line_len(reader: R, writer: W, max_line_len: usize) -> Self {
        Self {
            reader,
            writer,
            line: Vec::new(),
            max_line_len,
        }
    }

    /// Returns the wrapped reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> Transport for LineDelimited<R, W> {
    fn read_message(&mut self) -> Result<String, TransportError> {
        self.line.clear();
        // Room for the payload plus a `\r\n` terminator.
        let limit = u64::try_from(self.max_line_len)
            .unwrap_or(u64::MAX)
            .saturating_add(2);
        if (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.line)?
            == 0
        {
            return Err(TransportError::PeerClosed);
        }
        if self.line.last() == Some(&b'\n') {
            let _ = self.line.pop();
            if self.line.last() == Some(&b'\r') {
                let _ = self.line.pop();
            }
        }
        if self.line.is_empty() {
            return Err(TransportError::PeerClosed);
        }
        if self.line.len() > self.max_line_len {
            return Err(TransportError::MalformedFrame(format!(
                "line exceeds limit of {} bytes",
                self.max_line_len
            )));
        }

        String::from_utf8(self.line.clone())
            .map_err(|error| TransportError::MalformedFrame(format!("line is not UTF-8: {error}")))
    }

    fn write_message(&mut self, payload: &str) -> Result<(), TransportError> {
        if payload.contains('\n') {
            return Err(TransportError::MalformedFrame(
                "payload contains a newline".into(),
            ));
        }
        self.writer.write_all(payload.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads until `buf` is full or the stream ends, returning the bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}
