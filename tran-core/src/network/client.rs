//! The line-protocol client.
//!
//! ```text
//!  new() ──► closed ──connect()──► open ──write()/read_all()──► open
//!              ▲                     │
//!              └── close() / fatal ──┘
//! ```
//!
//! The live session and the closed flag sit behind one lock, so
//! `is_closed`, `close` and the entry checks of `write`/`read_all` see a
//! consistent pair. The session itself is split into a read half and a
//! write half, each with its own async lock, so `close` never waits on an
//! in-flight read or write; it cancels them instead.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::codec::{Line, LineCodec, MAX_LINE_LENGTH};
use crate::error::TranError;
use crate::network::fault::{self, SocketOp};
use crate::network::tls::{self, PemTlsConfig, TlsConfigProvider};
use crate::network::transport::{NETWORK, Transport};
use crate::protocol::{self, LF, Terminator};

// ── Client trait ─────────────────────────────────────────────────

/// Operations of a line-protocol client.
#[async_trait]
pub trait Client: Send + Sync {
    /// Dial the server. A live connection is closed first.
    async fn connect(&self) -> Result<(), TranError>;

    /// Send one framed request and flush it.
    async fn write(&self, data: &[u8]) -> Result<(), TranError>;

    /// Read lines until the end sentinel and return them joined with LF.
    async fn read_all(&self) -> Result<Bytes, TranError>;

    fn host(&self) -> &str;

    fn port(&self) -> u16;

    /// Close the connection. Closing a closed client is a no-op.
    async fn close(&self) -> Result<(), TranError>;

    /// Whether the client is unusable until the next `connect`.
    fn is_closed(&self) -> bool;
}

/// How long `close` waits for the write half to shut down (TCP FIN or TLS
/// close_notify) before dropping the connection anyway.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ── Session ──────────────────────────────────────────────────────

type LineWriter = FramedWrite<WriteHalf<Transport>, LineCodec>;

struct LineReader<R = ReadHalf<Transport>> {
    frames: FramedRead<R, LineCodec>,
    // FramedRead answers `None` once after yielding an error, then reads on.
    errored: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(inner: R, max_line_length: usize) -> Self {
        Self {
            frames: FramedRead::new(inner, LineCodec::with_max_length(max_line_length)),
            errored: false,
        }
    }

    async fn next_line(&mut self) -> io::Result<Line> {
        loop {
            match self.frames.next().await {
                Some(Ok(line)) => {
                    self.errored = false;
                    return Ok(line);
                }
                Some(Err(e)) => {
                    self.errored = true;
                    return Err(e);
                }
                None if std::mem::take(&mut self.errored) => continue,
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed by peer",
                    ));
                }
            }
        }
    }
}

struct Session {
    reader: tokio::sync::Mutex<LineReader>,
    writer: tokio::sync::Mutex<LineWriter>,
    shutdown: CancellationToken,
}

impl Session {
    fn new(transport: Transport, max_line_length: usize) -> Arc<Self> {
        let (rd, wr) = tokio::io::split(transport);
        Arc::new(Self {
            reader: tokio::sync::Mutex::new(LineReader::new(rd, max_line_length)),
            writer: tokio::sync::Mutex::new(FramedWrite::new(wr, LineCodec::new())),
            shutdown: CancellationToken::new(),
        })
    }

    /// Run `fut` unless the session is closed first.
    async fn until_closed<T>(&self, fut: impl Future<Output = io::Result<T>>) -> io::Result<T> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(closed_locally()),
            res = fut => res,
        }
    }
}

fn closed_locally() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "client closed locally")
}

struct State {
    closed: bool,
    session: Option<Arc<Session>>,
}

// ── TcpClient ────────────────────────────────────────────────────

/// A [`Client`] over TCP, optionally wrapped in TLS.
///
/// Constructing a client performs no I/O; it starts closed.
pub struct TcpClient {
    host: String,
    port: u16,
    enable_tls: bool,
    cert_file: PathBuf,
    insecure_skip_verify: bool,
    tls_provider: Arc<dyn TlsConfigProvider>,
    max_line_length: usize,
    close_timeout: Duration,
    state: Mutex<State>,
}

impl TcpClient {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        enable_tls: bool,
        cert_file: impl Into<PathBuf>,
        insecure_skip_verify: bool,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            enable_tls,
            cert_file: cert_file.into(),
            insecure_skip_verify,
            tls_provider: Arc::new(PemTlsConfig),
            max_line_length: MAX_LINE_LENGTH,
            close_timeout: CLOSE_TIMEOUT,
            state: Mutex::new(State {
                closed: true,
                session: None,
            }),
        }
    }

    /// Use `provider` instead of [`PemTlsConfig`] to build TLS settings.
    pub fn with_tls_provider(mut self, provider: Arc<dyn TlsConfigProvider>) -> Self {
        self.tls_provider = provider;
        self
    }

    /// Limit received lines to `max` bytes instead of [`MAX_LINE_LENGTH`].
    /// Applies from the next `connect`.
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Wait at most `limit` for a graceful shutdown in `close`.
    pub fn with_close_timeout(mut self, limit: Duration) -> Self {
        self.close_timeout = limit;
        self
    }

    pub fn network(&self) -> &'static str {
        NETWORK
    }

    /// `host:port`, as dialed.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tls_enabled(&self) -> bool {
        self.enable_tls
    }

    pub fn cert_file(&self) -> &Path {
        &self.cert_file
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The live session, or `None` after forcing the closed flag.
    fn live_session(&self) -> Option<Arc<Session>> {
        let mut state = self.lock();
        if state.closed || state.session.is_none() {
            state.closed = true;
            return None;
        }
        state.session.clone()
    }

    /// Classify `err`, raised on `session`, and close the client if it is
    /// fatal and `session` is still the live one.
    ///
    /// Returns whether the client was closed.
    async fn check_and_close(
        &self,
        session: &Arc<Session>,
        op: SocketOp,
        err: &io::Error,
    ) -> bool {
        let fault = fault::classify(op, err);
        if !fault.is_fatal() {
            return false;
        }
        let current = {
            let mut state = self.lock();
            let is_live = state
                .session
                .as_ref()
                .is_some_and(|live| Arc::ptr_eq(live, session));
            if is_live {
                state.closed = true;
                state.session.take()
            } else {
                None
            }
        };
        let Some(current) = current else {
            debug!(?fault, "{op} error on a stale connection to {}", self.address());
            return false;
        };

        debug!(?fault, "closing {} after {op} error", self.address());
        if let Err(e) = self.shutdown_session(current).await {
            debug!("close after fatal error failed: {e}");
        }
        true
    }

    /// Cancel the session's in-flight I/O and shut down its write half.
    async fn shutdown_session(&self, session: Arc<Session>) -> Result<(), TranError> {
        session.shutdown.cancel();
        debug!("client {} closed", self.address());

        // A write in flight holds the writer; its half is dropped when it returns.
        let Ok(mut writer) = session.writer.try_lock() else {
            return Ok(());
        };
        // A TLS shutdown flushes queued records first and stalls while the
        // peer is not reading.
        match timeout(self.close_timeout, writer.get_mut().shutdown()).await {
            Ok(Err(e)) if e.kind() != io::ErrorKind::NotConnected => Err(TranError::Close(e)),
            Ok(_) => Ok(()),
            Err(_) => {
                debug!(
                    "shutdown of {} timed out after {:?}, dropping it",
                    self.address(),
                    self.close_timeout
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Client for TcpClient {
    async fn connect(&self) -> Result<(), TranError> {
        if !self.is_closed() {
            debug!("replacing live connection to {}", self.address());
            if let Err(e) = self.close().await {
                debug!("close before reconnect failed: {e}");
            }
        }

        let address = self.address();
        let dialed = if self.enable_tls {
            let config = self
                .tls_provider
                .client_config(self.insecure_skip_verify, &self.cert_file)?;
            let name = tls::server_name(&self.host)?;
            Transport::dial_tls(&self.host, self.port, name, config).await
        } else {
            Transport::dial(&self.host, self.port).await
        };

        match dialed {
            Ok(transport) => {
                debug!(tls = transport.is_tls(), "client connected to {address}");
                let mut state = self.lock();
                state.session = Some(Session::new(transport, self.max_line_length));
                state.closed = false;
                Ok(())
            }
            Err(source) => {
                // No session was opened, so there is nothing to close.
                let fault = fault::classify(SocketOp::Connect, &source);
                debug!(?fault, "connect fault");
                error!("client connect to {address} failed: {source}");
                Err(TranError::Connect { address, source })
            }
        }
    }

    async fn write(&self, data: &[u8]) -> Result<(), TranError> {
        let session = self.live_session().ok_or(TranError::NotConnected)?;

        let result = {
            let mut guard = session.writer.lock().await;
            let writer = &mut *guard;
            match session.until_closed(writer.feed(data)).await {
                Ok(()) => session
                    .until_closed(writer.flush())
                    .await
                    .map_err(|e| (SocketOp::Flush, e)),
                Err(e) => Err((SocketOp::Write, e)),
            }
        };

        let Err((op, source)) = result else {
            return Ok(());
        };
        self.check_and_close(&session, op, &source).await;
        error!("client {op} failed: {source}");
        Err(TranError::Write { op, source })
    }

    async fn read_all(&self) -> Result<Bytes, TranError> {
        let session = self.live_session().ok_or(TranError::NotConnected)?;

        let mut result = BytesMut::new();
        let outcome = {
            let mut reader = session.reader.lock().await;
            loop {
                let line = match session.until_closed(reader.next_line()).await {
                    Ok(Line::Complete(line)) => line,
                    Ok(Line::Overlong) => {
                        break Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("line exceeds {} bytes", self.max_line_length),
                        ));
                    }
                    Err(e) => break Err(e),
                };
                let (content, terminator) = protocol::split_terminator(&line);
                result.extend_from_slice(content);
                result.put_u8(LF);
                if terminator.is_end() {
                    break Ok(terminator);
                }
            }
        };

        match outcome {
            Ok(Terminator::ErrorEnd) => {
                let payload = result.freeze();
                error!("server execute error: {}", String::from_utf8_lossy(&payload));
                Err(TranError::ServerExecute { payload })
            }
            Ok(_) => Ok(result.freeze()),
            Err(source) => {
                self.check_and_close(&session, SocketOp::Read, &source).await;
                error!("client read failed: {source}");
                Err(TranError::Read {
                    partial: result.freeze(),
                    source,
                })
            }
        }
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn close(&self) -> Result<(), TranError> {
        let session = {
            let mut state = self.lock();
            state.closed = true;
            state.session.take()
        };
        match session {
            Some(session) => self.shutdown_session(session).await,
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.live_session().is_none()
    }
}

impl fmt::Debug for TcpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpClient")
            .field("network", &NETWORK)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("enable_tls", &self.enable_tls)
            .field("cert_file", &self.cert_file)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("max_line_length", &self.max_line_length)
            .field("closed", &self.lock().closed)
            .finish()
    }
}
