//! Classification of transport errors.
//!
//! Decides which I/O errors mean the connection is unusable. Fatal
//! faults close the client; everything else is only reported to the
//! caller.

use std::fmt;
use std::io;

/// The client stage that produced an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOp {
    Connect,
    Read,
    Write,
    Flush,
}

impl fmt::Display for SocketOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Read => "read",
            Self::Write => "write",
            Self::Flush => "flush",
        };
        f.write_str(name)
    }
}

/// Socket operations whose OS-level failure leaves the connection dead.
///
/// Covers the connect and receive calls (`connect`/`connectex`,
/// `read`/`wsarecv`). OS errors raised by any other stage are reported
/// as [`Fault::UnrecognizedSocketOp`] and do not close the client.
pub const FATAL_SOCKET_OPS: &[SocketOp] = &[SocketOp::Connect, SocketOp::Read];

/// Result of classifying an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The peer closed the stream.
    EndOfStream,
    /// An OS socket error from an operation in [`FATAL_SOCKET_OPS`].
    FatalSocketOp(SocketOp),
    /// An OS socket error from any other operation.
    UnrecognizedSocketOp(SocketOp),
    /// Not a socket failure (codec, TLS, local cancellation, ...).
    Other,
}

impl Fault {
    /// Whether the connection must be closed.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::EndOfStream | Self::FatalSocketOp(_))
    }
}

/// Classify `err`, raised while performing `op`.
pub fn classify(op: SocketOp, err: &io::Error) -> Fault {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        return Fault::EndOfStream;
    }
    if !is_socket_error(err) {
        return Fault::Other;
    }
    if FATAL_SOCKET_OPS.contains(&op) {
        Fault::FatalSocketOp(op)
    } else {
        tracing::warn!(%op, error = %err, "unrecognized socket error");
        Fault::UnrecognizedSocketOp(op)
    }
}

/// An OS-level error, either directly or one wrapping layer down.
fn is_socket_error(err: &io::Error) -> bool {
    if err.raw_os_error().is_some() {
        return true;
    }
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<io::Error>())
        .is_some_and(|inner| inner.raw_os_error().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ECONNRESET on unix, WSAECONNRESET on windows; only its presence matters.
    const RESET: i32 = 104;

    #[test]
    fn end_of_stream_is_fatal() {
        let err = io::Error::from(io::ErrorKind::UnexpectedEof);
        for op in [SocketOp::Connect, SocketOp::Read, SocketOp::Write, SocketOp::Flush] {
            assert_eq!(classify(op, &err), Fault::EndOfStream);
        }
        assert!(Fault::EndOfStream.is_fatal());
    }

    #[test]
    fn os_error_on_read_is_fatal() {
        let err = io::Error::from_raw_os_error(RESET);
        let fault = classify(SocketOp::Read, &err);
        assert_eq!(fault, Fault::FatalSocketOp(SocketOp::Read));
        assert!(fault.is_fatal());

        assert_eq!(
            classify(SocketOp::Connect, &err),
            Fault::FatalSocketOp(SocketOp::Connect)
        );
    }

    #[test]
    fn os_error_on_write_is_not_fatal() {
        let err = io::Error::from_raw_os_error(RESET);
        let fault = classify(SocketOp::Write, &err);
        assert_eq!(fault, Fault::UnrecognizedSocketOp(SocketOp::Write));
        assert!(!fault.is_fatal());
        assert!(!classify(SocketOp::Flush, &err).is_fatal());
    }

    #[test]
    fn wrapped_os_error_is_unwrapped_once() {
        let inner = io::Error::from_raw_os_error(RESET);
        let wrapped = io::Error::other(inner);
        assert_eq!(
            classify(SocketOp::Read, &wrapped),
            Fault::FatalSocketOp(SocketOp::Read)
        );

        let twice = io::Error::other(wrapped);
        assert_eq!(classify(SocketOp::Read, &twice), Fault::Other);
    }

    #[test]
    fn non_socket_errors_are_not_fatal() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "line too long");
        assert_eq!(classify(SocketOp::Read, &err), Fault::Other);

        let err = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(classify(SocketOp::Read, &err), Fault::Other);
        assert!(!Fault::Other.is_fatal());
    }

    #[test]
    fn op_names() {
        assert_eq!(SocketOp::Connect.to_string(), "connect");
        assert_eq!(SocketOp::Flush.to_string(), "flush");
    }
}
