//! # tran-core
//!
//! Client for a line-delimited, sentinel-terminated text protocol over
//! TCP, optionally secured with TLS.
//!
//! This crate contains:
//! - **Protocol**: sentinel constants and terminator matching
//! - **Codec**: `LineCodec` for framed I/O via `tokio_util`
//! - **Network**: the `Client` trait and its `TcpClient` implementation,
//!   the TLS configuration provider and the transport fault classifier
//! - **Error**: `TranError`, a typed `thiserror`-based error hierarchy

pub mod codec;
pub mod error;
pub mod network;
pub mod protocol;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{Line, LineCodec, MAX_LINE_LENGTH};
pub use error::{TlsError, TranError};
pub use network::{
    CLOSE_TIMEOUT, Client, FATAL_SOCKET_OPS, Fault, NETWORK, PemTlsConfig, SocketOp, TcpClient,
    TlsConfigProvider, Transport,
};
pub use protocol::{END_IDENTITY, ERROR_END_IDENTITY, ERROR_IDENTITY, LF, LF_BYTES, Terminator};
