//! The rolling handshake-transcript hash.
//!
//! Before a cipher suite is negotiated the hash algorithm is unknown, yet the
//! message bytes must still be captured. This is modelled, per the design
//! note, as a hash that starts `Deferred` (a growing byte log) and `commit`s
//! to a `Concrete` running digest once the algorithm is known; updates after
//! that flow straight into the digest instead of replaying the log.

use sha2::{Digest, Sha256};

use crate::handshake_header::{HandshakeHeader, HANDSHAKE_HEADER_LENGTH, HELLO_REQUEST};
use crate::message::Message;

/// The hash algorithms a negotiated DTLS 1.2 cipher suite may select for its
/// PRF/transcript. This codebase's existing cipher suite table
/// (`CipherSuiteHash`) only ever produces SHA-256, so this mirrors that
/// rather than speculating about algorithms no cipher suite here uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TranscriptHashAlgorithm {
    Sha256,
}

#[derive(Clone)]
enum State {
    Deferred(Vec<u8>),
    Concrete(Sha256),
}

/// Forkable, deferred-then-committed transcript hash.
#[derive(Clone)]
pub struct TranscriptHash {
    state: State,
}

impl TranscriptHash {
    pub fn new() -> Self {
        TranscriptHash {
            state: State::Deferred(Vec::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Deferred(log) => log.extend_from_slice(data),
            State::Concrete(hasher) => hasher.update(data),
        }
    }

    /// Feeds one handshake message into the transcript, in canonical
    /// unfragmented form: a 12-byte header with `fragment_offset = 0`,
    /// `fragment_length = length = len(body)`, followed by `body`.
    /// HelloRequest (type 0) never participates in the transcript.
    pub fn update_message(&mut self, msg: &Message) {
        if msg.typ == HELLO_REQUEST {
            return;
        }
        let header = HandshakeHeader {
            handshake_type: msg.typ,
            length: msg.body.len() as u32,
            message_sequence: msg.seq,
            fragment_offset: 0,
            fragment_length: msg.body.len() as u32,
        };
        let mut raw = Vec::with_capacity(HANDSHAKE_HEADER_LENGTH + msg.body.len());
        header
            .marshal(&mut raw)
            .expect("marshal into a Vec<u8> cannot fail");
        raw.extend_from_slice(&msg.body);
        self.update(&raw);
    }

    /// Transitions `Deferred` -> `Concrete` by replaying the buffered log
    /// into the now-known algorithm. A no-op if already concrete.
    pub fn commit(&mut self, algorithm: TranscriptHashAlgorithm) {
        if let State::Deferred(log) = &self.state {
            let TranscriptHashAlgorithm::Sha256 = algorithm;
            let mut hasher = Sha256::new();
            hasher.update(log);
            self.state = State::Concrete(hasher);
        }
    }

    /// Re-initializes the live hash, discarding everything fed so far.
    /// Used for a HelloRequest/renegotiation-like restart.
    pub fn reset(&mut self) {
        self.state = State::Deferred(Vec::new());
    }

    /// Produces a snapshot digest without perturbing the live hash, by
    /// forking (cheap: `Sha256` and the deferred log are both `Clone`) and
    /// finalizing the fork.
    pub fn get_current_hash(&self) -> Vec<u8> {
        match &self.state {
            State::Deferred(log) => {
                let mut hasher = Sha256::new();
                hasher.update(log);
                hasher.finalize().to_vec()
            }
            State::Concrete(hasher) => hasher.clone().finalize().to_vec(),
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self.state, State::Concrete(_))
    }
}

impl Default for TranscriptHash {
    fn default() -> Self {
        Self::new()
    }
}
