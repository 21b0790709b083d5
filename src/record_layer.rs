//! The record-layer contract this core consumes. The concrete record layer
//! (epoch/sequence numbers, encryption, MTU discovery, timer source) is an
//! external collaborator and out of scope here -- this is only the surface
//! the Flight Director, Outbound Builder and Post-finish Hook are allowed to
//! call.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Duration;

use crate::error::Result;

/// What the Flight Director needs from the layer underneath it.
///
/// `receive` returns `Ok(None)` for "no datagram within `timeout`" (the
/// spec's "negative return"), `Ok(Some(n))` for "received n bytes into
/// `buf`", and `Err` for a fatal or transient I/O failure -- the two are
/// indistinguishable at this layer and both treated as a timeout for
/// retransmit purposes by the caller (see `ReliableHandshake::receive_message`).
#[async_trait]
pub trait RecordLayer: Send + Sync {
    /// Current max payload bytes per record this layer can send.
    fn get_send_limit(&self) -> usize;

    /// Current max payload bytes per received record.
    fn get_receive_limit(&self) -> usize;

    /// Send `buf` as a single atomic record. May fail fatally.
    async fn send(&self, buf: &[u8]) -> Result<()>;

    /// Block for at most `timeout` waiting for the next handshake record.
    async fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>>;

    /// Request that subsequent sends use the same epoch the last
    /// transmitted flight was sent under.
    async fn reset_write_epoch(&self);

    /// Inform the record layer the handshake concluded. `hook`, if present,
    /// should be invoked for every incoming handshake record during the
    /// post-finish grace window (>= 2*MSL), then discarded.
    async fn handshake_successful(&self, hook: Option<Arc<dyn PostFinishRetransmitHook>>);
}

/// Capability-style callback the record layer invokes on each incoming
/// handshake record during the post-finish grace window, rather than the
/// core inheriting from some "hook-aware connection" base -- the record
/// layer owns the window's lifetime, this object only owns the reaction.
#[async_trait]
pub trait PostFinishRetransmitHook: Send + Sync {
    async fn on_handshake_record(&self, epoch: u16, record: &[u8]) -> Result<()>;
}
