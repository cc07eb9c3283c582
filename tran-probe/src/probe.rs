//! One request/response exchange.

use bytes::Bytes;
use tracing::{debug, warn};
use tran_core::{Client, TranError};

/// Connect, send `payload`, collect the response and close.
///
/// The client is closed whatever the outcome; the exchange error wins
/// over a close error.
pub async fn exchange<C: Client + ?Sized>(client: &C, payload: &[u8]) -> Result<Bytes, TranError> {
    client.connect().await?;
    debug!("connected to {}:{}", client.host(), client.port());

    let result = match client.write(payload).await {
        Ok(()) => client.read_all().await,
        Err(e) => Err(e),
    };

    if let Err(e) = client.close().await {
        warn!("close failed: {e}");
    }
    result
}
