//! Protocol constants shared by clients and servers.
//!
//! A request is a single line: `<payload><END_IDENTITY><LF>`.
//! A response is one or more LF-terminated lines; the last one ends with
//! [`END_IDENTITY`], or with [`ERROR_END_IDENTITY`] when the peer failed
//! to execute the request.

use bytes::{BufMut, Bytes, BytesMut};

/// Marks the final line of a message.
pub const END_IDENTITY: &[u8] = b"${end}";

/// Marker placed in front of [`END_IDENTITY`] when the peer reports an
/// execution failure.
pub const ERROR_IDENTITY: &[u8] = b"${error}";

/// `ERROR_IDENTITY` followed by `END_IDENTITY`.
///
/// Any line ending with this also ends with [`END_IDENTITY`].
pub const ERROR_END_IDENTITY: &[u8] = b"${error}${end}";

/// Line feed, the line delimiter.
pub const LF: u8 = b'\n';

/// [`LF`] as a byte slice.
pub const LF_BYTES: &[u8] = b"\n";

/// The kind of terminator found at the tail of a received line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Not the final line; more lines follow.
    None,
    /// Final line of a successful response.
    End,
    /// Final line of a response the peer failed to execute.
    ErrorEnd,
}

impl Terminator {
    /// Returns `true` for either final-line terminator.
    pub fn is_end(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Split a line into its content and terminator.
///
/// The error sentinel is tested first since it is a suffix-superset of
/// the plain one. The matched sentinel is removed from the returned
/// content; lines without a sentinel are returned whole.
pub fn split_terminator(line: &[u8]) -> (&[u8], Terminator) {
    if let Some(content) = line.strip_suffix(ERROR_END_IDENTITY) {
        (content, Terminator::ErrorEnd)
    } else if let Some(content) = line.strip_suffix(END_IDENTITY) {
        (content, Terminator::End)
    } else {
        (line, Terminator::None)
    }
}

/// Build the wire form of a request: `payload ++ END_IDENTITY ++ LF`.
pub fn frame_request(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + END_IDENTITY.len() + 1);
    put_frame(&mut buf, payload);
    buf.freeze()
}

pub(crate) fn put_frame(dst: &mut BytesMut, payload: &[u8]) {
    dst.reserve(payload.len() + END_IDENTITY.len() + 1);
    dst.put_slice(payload);
    dst.put_slice(END_IDENTITY);
    dst.put_u8(LF);
}
