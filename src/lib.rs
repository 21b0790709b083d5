#![warn(rust_2018_idioms)]

//! The reliable handshake layer of DTLS: flight-based retransmission,
//! per-message fragment reassembly, and the rolling handshake-transcript
//! hash, sitting between an unreliable datagram record layer below and the
//! cryptographic TLS state machine above.
//!
//! [`ReliableHandshake`] is the single entry point; everything else in this
//! crate is a collaborator it owns or depends on.

pub mod alert;
pub mod config;
pub mod error;
pub mod flight;
pub mod handshake_header;
pub mod handshake_manager;
pub mod message;
pub mod outbound;
pub mod reassembler;
pub mod record_layer;
pub mod retransmit;
pub mod transcript;

pub use config::HandshakeConfig;
pub use error::{Error, Result};
pub use handshake_manager::ReliableHandshake;
pub use message::Message;
pub use record_layer::{PostFinishRetransmitHook, RecordLayer};
pub use transcript::TranscriptHashAlgorithm;
