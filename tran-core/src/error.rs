//! Error types for the tran client.
//!
//! Every fallible client operation returns `Result<T, TranError>`.
//! Read failures carry the bytes accumulated before the failure so the
//! caller never loses a partial response.

use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;

use crate::network::fault::SocketOp;

/// The canonical error type for client operations.
#[derive(Debug, Error)]
pub enum TranError {
    // ── Local state ──────────────────────────────────────────────
    /// A write or read was attempted while the client is closed.
    #[error("client is not connected")]
    NotConnected,

    // ── Connect ──────────────────────────────────────────────────
    /// The TLS configuration could not be built.
    #[error("tls configuration failed: {0}")]
    Tls(#[from] TlsError),

    /// The dial (or TLS handshake) to the peer failed.
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    // ── Transport ────────────────────────────────────────────────
    /// Writing or flushing a request failed.
    #[error("client {op} failed: {source}")]
    Write {
        op: SocketOp,
        #[source]
        source: io::Error,
    },

    /// Reading the response failed after `partial` bytes were assembled.
    #[error("client read failed after {} bytes: {source}", .partial.len())]
    Read {
        partial: Bytes,
        #[source]
        source: io::Error,
    },

    /// Shutting down the underlying stream failed.
    #[error("client close failed: {0}")]
    Close(#[source] io::Error),

    // ── Protocol ─────────────────────────────────────────────────
    /// The peer terminated its response with the error sentinel.
    ///
    /// Not a transport fault: the connection stays open.
    #[error("server execute error")]
    ServerExecute { payload: Bytes },
}

impl TranError {
    /// Bytes assembled before the error, for read-side errors.
    pub fn partial(&self) -> Option<&Bytes> {
        match self {
            Self::Read { partial, .. } => Some(partial),
            Self::ServerExecute { payload } => Some(payload),
            _ => None,
        }
    }

    /// The underlying I/O error, if this is a transport error.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Connect { source, .. } | Self::Write { source, .. } | Self::Read { source, .. } => {
                Some(source)
            }
            Self::Close(source) => Some(source),
            _ => None,
        }
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }

    pub fn is_server_execute(&self) -> bool {
        matches!(self, Self::ServerExecute { .. })
    }
}

// ── TlsError ─────────────────────────────────────────────────────

/// Failure to produce a client TLS configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The certificate file could not be read.
    #[error("cannot read certificate file {}: {source}", .path.display())]
    CertFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The certificate file holds no usable PEM certificate.
    #[error("no certificates found in {}", .0.display())]
    NoCertificates(PathBuf),

    /// The host cannot be used as a TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// rustls rejected the configuration.
    #[error(transparent)]
    Rustls(#[from] rustls::Error),
}
