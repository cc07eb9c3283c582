//! Line framing for `tokio_util::codec`.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::{self, LF};

/// Upper bound on a single received line, delimiter excluded.
pub const MAX_LINE_LENGTH: usize = 64 * 1024 * 1024;

/// A decoded unit of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A complete line without its delimiter.
    Complete(BytesMut),
    /// A line grew past the length limit. Its bytes up to and including
    /// the next LF are dropped, and decoding resumes after them.
    Overlong,
}

/// Encodes requests as `payload ++ END_IDENTITY ++ LF` and decodes
/// LF-delimited lines.
///
/// Decoded lines carry neither the LF nor a CR directly before it. An
/// over-long line is reported once as [`Line::Overlong`] rather than as a
/// decode error, so the framed reader stays usable.
#[derive(Debug, Clone)]
pub struct LineCodec {
    // Bytes before this offset are known to contain no LF.
    next_index: usize,
    max_length: usize,
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            discarding: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn without_cr(mut line: BytesMut) -> BytesMut {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line
}

impl Decoder for LineCodec {
    type Item = Line;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.discarding {
            match src.iter().position(|b| *b == LF) {
                Some(newline) => {
                    src.advance(newline + 1);
                    self.discarding = false;
                }
                None => {
                    src.clear();
                    return Ok(None);
                }
            }
        }

        let search_end = src.len().min(self.max_length.saturating_add(1));
        match src[self.next_index..search_end].iter().position(|b| *b == LF) {
            Some(offset) => {
                let newline = self.next_index + offset;
                self.next_index = 0;
                let mut line = src.split_to(newline + 1);
                line.truncate(newline);
                Ok(Some(Line::Complete(without_cr(line))))
            }
            None if src.len() > self.max_length => {
                self.next_index = 0;
                self.discarding = true;
                Ok(Some(Line::Overlong))
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        self.discarding = false;
        if src.is_empty() {
            Ok(None)
        } else {
            // Unterminated trailing line.
            let line = src.split_to(src.len());
            Ok(Some(Line::Complete(without_cr(line))))
        }
    }
}

impl Encoder<&[u8]> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        protocol::put_frame(dst, payload);
        Ok(())
    }
}
