use tokio::time::Duration;

use crate::reassembler::DEFAULT_MAX_MESSAGE_LENGTH;

/// Tunables the Flight Director and Retransmit Controller are allowed to
/// vary. Mirrors the shape of this codebase's existing `HandshakeConfig`
/// (which carries a `retransmit_interval` alongside the cipher-suite/
/// certificate/PSK configuration that belongs to the TLS state machine
/// layer above and has no place here).
#[derive(Clone, Debug)]
pub struct HandshakeConfig {
    /// Initial `read_timeout_ms`, before any backoff (spec default: 1000ms).
    pub initial_retransmit_timeout: Duration,
    /// Upper bound `read_timeout_ms` is capped at (spec default: 60000ms).
    pub max_retransmit_timeout: Duration,
    /// Multiplier applied to `read_timeout_ms` on every retransmit trigger
    /// (spec default: 2).
    pub retransmit_backoff_factor: u32,
    /// How many seq numbers beyond `next_receive_seq` a reassembler may be
    /// buffered for (spec constant: 10).
    pub max_receive_ahead: u16,
    /// Upper bound on a single message's declared `length`, guarding
    /// against a peer requesting a pathological allocation.
    pub max_message_length: u32,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        HandshakeConfig {
            initial_retransmit_timeout: Duration::from_millis(1000),
            max_retransmit_timeout: Duration::from_millis(60_000),
            retransmit_backoff_factor: 2,
            max_receive_ahead: 10,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}
