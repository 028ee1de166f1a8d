//! Newline-delimited framing for the event stream.
//!
//! Every line of input is surfaced as a [`Line`], whether or not it decodes
//! into an event, so callers can echo the raw stream as it is consumed.
//! Decoding never fails: blank lines, interleaved build output and broken
//! JSON all come through with `event: None`.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::debug;

use super::TestEvent;

/// Maximum line length: 1 MB.
const MAX_LINE_LENGTH: usize = 1_048_576;

/// One consumed input line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Line content without the trailing newline.
    pub raw: Bytes,
    pub event: Option<TestEvent>,
}

/// Splits a byte stream on `\n` and decodes each line into a [`TestEvent`].
#[derive(Debug)]
pub struct EventCodec {
    max_line_length: usize,
    /// Offset up to which the buffer is known not to contain a newline.
    next_index: usize,
    lines: usize,
    discarding: bool,
}

impl EventCodec {
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Lines longer than `max_line_length` are dropped without being decoded.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
            lines: 0,
            discarding: false,
        }
    }

    fn frame(&mut self, mut raw: BytesMut) -> Line {
        if raw.last() == Some(&b'\r') {
            raw.truncate(raw.len() - 1);
        }
        let raw = raw.freeze();
        Line {
            number: self.lines,
            event: decode_event(self.lines, &raw),
            raw,
        }
    }
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EventCodec {
    type Item = Line;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let scanned = self.next_index.min(src.len());
            let newline = src[scanned..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| scanned + offset);

            let Some(end) = newline else {
                if src.len() > self.max_line_length {
                    if !self.discarding {
                        debug!(line = self.lines + 1, "dropping oversized line");
                    }
                    self.discarding = true;
                    src.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            self.next_index = 0;
            let mut frame = src.split_to(end + 1);
            frame.truncate(end);
            self.lines += 1;

            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if frame.len() > self.max_line_length {
                debug!(line = self.lines, "dropping oversized line");
                continue;
            }

            return Ok(Some(self.frame(frame)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() || std::mem::take(&mut self.discarding) {
            src.clear();
            return Ok(None);
        }

        // Final line without a trailing newline.
        self.next_index = 0;
        self.lines += 1;
        let frame = src.split_to(src.len());
        Ok(Some(self.frame(frame)))
    }
}

/// Decode a single line. Returns `None` for blank, malformed and empty events.
pub fn decode_event(line: usize, raw: &[u8]) -> Option<TestEvent> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    let event: TestEvent = match serde_json::from_slice(raw) {
        Ok(event) => event,
        Err(e) => {
            debug!(line, error = %e, "failed to decode event");
            return None;
        }
    };

    if event.is_empty() {
        debug!(line, "dropping empty event");
        return None;
    }

    Some(event)
}
