use crate::codec::FRAME_DELIMITER;
use crate::error::ModelError;
use tracing::trace;

/// Default cap on the bytes of one pending frame.
pub const DEFAULT_FRAME_LIMIT: usize = 64 * 1024;

/// Splits a byte stream into newline-delimited frames.
///
/// The transport hands over bytes in whatever chunks it reads; [`FrameBuffer::next_frame`]
/// yields each complete frame, delimiter included, ready for
/// [`Registry::from_framed_bytes`](crate::Registry::from_framed_bytes). No I/O happens
/// here.
///
/// A frame whose content exceeds the limit is dropped with
/// [`ModelError::FrameTooLarge`]; the rest of it, up to the next delimiter, is
/// discarded as it arrives so the stream resynchronises on the following frame.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    limit: usize,
    scanned: usize,
    discarding: bool,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::with_limit(DEFAULT_FRAME_LIMIT)
    }
}

impl FrameBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self { buf: Vec::new(), limit, scanned: 0, discarding: false }
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes held for the frame in progress.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        if self.discarding {
            if let Some(end) = bytes.iter().position(|&b| b == FRAME_DELIMITER) {
                self.discarding = false;
                self.buf.extend_from_slice(&bytes[end + 1..]);
            }
        } else {
            self.buf.extend_from_slice(bytes);
        }
    }

    /// The next complete frame, `Ok(None)` until one has arrived.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ModelError> {
        let found = self.buf[self.scanned..].iter().position(|&b| b == FRAME_DELIMITER);
        match found {
            Some(offset) => {
                let end = self.scanned + offset;
                let frame: Vec<u8> = self.buf.drain(..=end).collect();
                self.scanned = 0;
                if end > self.limit {
                    trace!(len = end, limit = self.limit, "Dropping oversized frame");
                    return Err(ModelError::FrameTooLarge { limit: self.limit, context: None });
                }
                Ok(Some(frame))
            },
            None if self.buf.len() > self.limit => {
                trace!(len = self.buf.len(), limit = self.limit, "Discarding oversized partial frame");
                self.buf.clear();
                self.scanned = 0;
                self.discarding = true;
                Err(ModelError::FrameTooLarge { limit: self.limit, context: None })
            },
            None => {
                self.scanned = self.buf.len();
                Ok(None)
            },
        }
    }

    /// Ends the stream, reporting a trailing partial frame as
    /// [`ModelError::IncompleteFrame`].
    pub fn finish(self) -> Result<(), ModelError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ModelError::IncompleteFrame { buffered: self.buf.len(), context: None })
        }
    }
}
