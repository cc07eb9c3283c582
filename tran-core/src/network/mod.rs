pub mod client;
pub mod fault;
pub mod tls;
pub mod transport;

pub use client::{CLOSE_TIMEOUT, Client, TcpClient};
pub use fault::{FATAL_SOCKET_OPS, Fault, SocketOp};
pub use tls::{PemTlsConfig, TlsConfigProvider};
pub use transport::{NETWORK, Transport};
