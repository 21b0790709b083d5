//! The Flight Director: the core's public surface (`send_message`,
//! `receive_message`, `notify_hello_complete`, `finish`,
//! `get_current_hash`, `reset_handshake_messages_digest`) and the state
//! transitions that tie the Outbound Builder, Inbound Reassembler,
//! Retransmit Controller and Transcript Hash Adaptor together.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, trace};
use tokio::sync::Mutex;

use crate::config::HandshakeConfig;
use crate::error::{Error, Result};
use crate::flight::{InboundFlightTable, OutboundFlight};
use crate::handshake_header::{HandshakeHeader, HANDSHAKE_HEADER_LENGTH};
use crate::message::Message;
use crate::outbound;
use crate::record_layer::{PostFinishRetransmitHook, RecordLayer};
use crate::retransmit::RetransmitController;
use crate::transcript::{TranscriptHash, TranscriptHashAlgorithm};

/// Future-seq reassemblers are only buffered this far ahead of
/// `next_receive_seq` (spec constant `MAX_RECEIVE_AHEAD = 10`).
struct Inner {
    sending: bool,
    next_send_seq: u16,
    next_receive_seq: u16,
    outbound: OutboundFlight,
    current: InboundFlightTable,
    previous: Option<InboundFlightTable>,
    transcript: TranscriptHash,
    retransmit: RetransmitController,
}

impl Inner {
    fn new(config: &HandshakeConfig) -> Self {
        Inner {
            sending: false,
            next_send_seq: 0,
            next_receive_seq: 0,
            outbound: OutboundFlight::new(),
            current: InboundFlightTable::new(config.max_message_length),
            previous: None,
            transcript: TranscriptHash::new(),
            retransmit: RetransmitController::new(config),
        }
    }

    /// Extra messages left in a flight after `next_receive_seq` has
    /// advanced past them are tolerated, not a protocol error -- see
    /// DESIGN.md's record of this open question.
    fn check_inbound_flight(&self) {
        if !self.current.is_empty() {
            trace!(
                "check_inbound_flight: {} reassembler(s) left in the current flight at next_receive_seq={}",
                "some", self.next_receive_seq
            );
        }
    }
}

/// One DTLS association's reliable handshake engine. Single-owner: no
/// method is safe to call concurrently with itself or any other method on
/// the same instance, except that the record layer may invoke the
/// post-finish hook (`PostFinishHook`) after `finish()` returns, on a task
/// this struct no longer drives -- hence the shared state lives behind a
/// `tokio::sync::Mutex` rather than being held by `&mut self` outright.
pub struct ReliableHandshake<R: RecordLayer> {
    record_layer: Arc<R>,
    config: HandshakeConfig,
    inner: Arc<Mutex<Inner>>,
}

impl<R: RecordLayer + 'static> ReliableHandshake<R> {
    pub fn new(record_layer: Arc<R>, config: HandshakeConfig) -> Self {
        let inner = Inner::new(&config);
        ReliableHandshake {
            record_layer,
            config,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Sends one handshake message as a new flight message. The first call
    /// after a `receive_message` flips the phase to sending and clears the
    /// previous outbound flight.
    pub async fn send_message(&self, typ: u8, body: Vec<u8>) -> Result<()> {
        let msg = {
            let mut inner = self.inner.lock().await;
            if !inner.sending {
                inner.check_inbound_flight();
                inner.sending = true;
                inner.outbound.clear();
                debug!("flight direction: receiving -> sending");
            }
            let seq = inner.next_send_seq;
            inner.next_send_seq += 1;
            let msg = Message::new(seq, typ, body);
            inner.outbound.push(msg.clone());
            msg
        };

        outbound::write_message(self.record_layer.as_ref(), &msg).await?;

        let mut inner = self.inner.lock().await;
        inner.transcript.update_message(&msg);
        Ok(())
    }

    /// Blocks until the next message in ascending seq order is complete,
    /// retransmitting the outbound flight under exponential backoff as
    /// needed.
    pub async fn receive_message(&self) -> Result<Message> {
        {
            let mut inner = self.inner.lock().await;
            if inner.sending {
                inner.current.reset_all();
                let drained = inner.current.take();
                inner.previous = Some(drained);
                inner.sending = false;
                debug!("flight direction: sending -> receiving");
            }

            if let Some(msg) = try_fast_path(&mut inner) {
                return Ok(msg);
            }
        }

        let receive_limit = self.record_layer.get_receive_limit();
        let mut buf = vec![0u8; receive_limit.max(HANDSHAKE_HEADER_LENGTH)];

        loop {
            let timeout = { self.inner.lock().await.retransmit.timeout() };
            match self.record_layer.receive(&mut buf, timeout).await {
                Ok(Some(n)) => {
                    let mut inner = self.inner.lock().await;
                    if let Some(msg) = self.handle_incoming_record(&mut inner, &buf[..n]).await? {
                        return Ok(msg);
                    }
                }
                Ok(None) | Err(_) => {
                    debug!("read timeout, retransmitting outbound flight");
                    let (outbound_snapshot, new_timeout) = {
                        let mut inner = self.inner.lock().await;
                        inner.retransmit.backoff();
                        (inner.outbound.clone(), inner.retransmit.timeout())
                    };
                    outbound::resend_outbound_flight(self.record_layer.as_ref(), &outbound_snapshot)
                        .await?;
                    trace!("read_timeout_ms is now {:?}", new_timeout);
                }
            }
        }
    }

    /// Parses and dispatches one received handshake record. Returns
    /// `Some(message)` when it completes ordered delivery of
    /// `next_receive_seq`.
    async fn handle_incoming_record(&self, inner: &mut Inner, record: &[u8]) -> Result<Option<Message>> {
        let fragment = match parse_record(record, inner.next_receive_seq, self.config.max_receive_ahead) {
            Some(f) => f,
            None => return Ok(None),
        };

        if fragment.seq < inner.next_receive_seq {
            let previous_completed_now = if let Some(previous) = inner.previous.as_mut() {
                if previous.get(fragment.seq).is_some() {
                    previous
                        .get_or_create(fragment.seq)
                        .contribute_fragment(
                            fragment.typ,
                            fragment.length,
                            fragment.offset,
                            fragment.data,
                        )?;
                }
                previous.all_complete()
            } else {
                false
            };

            if previous_completed_now {
                debug!("peer fully re-received its previous flight; resending");
                let outbound_snapshot = inner.outbound.clone();
                outbound::resend_outbound_flight(self.record_layer.as_ref(), &outbound_snapshot)
                    .await?;
                inner.retransmit.backoff();
                if let Some(previous) = inner.previous.as_mut() {
                    previous.reset_all();
                }
            }
            return Ok(None);
        }

        let reassembler = inner.current.get_or_create(fragment.seq);
        let accepted = reassembler.contribute_fragment(
            fragment.typ,
            fragment.length,
            fragment.offset,
            fragment.data,
        )?;
        if !accepted {
            return Ok(None);
        }

        if fragment.seq == inner.next_receive_seq {
            if let Some(body) = inner.current.get(fragment.seq).and_then(|r| r.body_if_complete()) {
                let body = body.to_vec();
                let typ = fragment.typ;
                let seq = fragment.seq;
                trace!("reassembled seq={} type={} len={}", seq, typ, body.len());
                inner.previous = None;
                inner.next_receive_seq += 1;
                let msg = Message::new(seq, typ, body);
                inner.transcript.update_message(&msg);
                return Ok(Some(msg));
            }
        }

        Ok(None)
    }

    /// Commits the deferred transcript hash to the now-negotiated
    /// algorithm.
    pub async fn notify_hello_complete(&self, algorithm: TranscriptHashAlgorithm) {
        let mut inner = self.inner.lock().await;
        inner.transcript.commit(algorithm);
        debug!("transcript hash committed");
    }

    /// Signals the handshake concluded. Installs the Post-finish
    /// Retransmit Hook on the record layer when this side sent the final
    /// flight.
    pub async fn finish(&self) -> Result<()> {
        let hook: Option<Arc<dyn PostFinishRetransmitHook>> = {
            let inner_guard = self.inner.lock().await;
            if !inner_guard.sending {
                inner_guard.check_inbound_flight();
                None
            } else if inner_guard.previous.is_some() {
                Some(Arc::new(PostFinishHook {
                    record_layer: self.record_layer.clone(),
                    inner: self.inner.clone(),
                }))
            } else {
                None
            }
        };

        debug!(
            "handshake finished, post-finish hook {}",
            if hook.is_some() { "installed" } else { "not installed" }
        );
        self.record_layer.handshake_successful(hook).await;
        Ok(())
    }

    /// Returns a snapshot digest of the transcript so far without
    /// perturbing the live hash.
    pub async fn get_current_hash(&self) -> Vec<u8> {
        self.inner.lock().await.transcript.get_current_hash()
    }

    /// Re-initializes the live transcript hash, discarding everything fed
    /// so far (used on a HelloRequest/renegotiation-like restart).
    pub async fn reset_handshake_messages_digest(&self) {
        self.inner.lock().await.transcript.reset();
    }
}

/// Finds `next_receive_seq` already complete in the current table -- true
/// right after an earlier call delivered a lower seq while a higher one had
/// already finished reassembling out of order (spec §4.A scenario 3).
fn try_fast_path(inner: &mut Inner) -> Option<Message> {
    let seq = inner.next_receive_seq;
    let (typ, body) = {
        let r = inner.current.get(seq)?;
        let body = r.body_if_complete()?.to_vec();
        (r.typ()?, body)
    };
    inner.previous = None;
    inner.next_receive_seq += 1;
    let msg = Message::new(seq, typ, body);
    inner.transcript.update_message(&msg);
    Some(msg)
}

struct ParsedFragment<'a> {
    seq: u16,
    typ: u8,
    length: u32,
    offset: u32,
    data: &'a [u8],
}

/// Validates a raw handshake record against the wire-format rules of
/// spec §4.A / §6. Malformed or out-of-window records are dropped (return
/// `None`) rather than surfaced as an error -- spec §7 kind 3.
fn parse_record(record: &[u8], next_receive_seq: u16, max_receive_ahead: u16) -> Option<ParsedFragment<'_>> {
    if record.len() < HANDSHAKE_HEADER_LENGTH {
        trace!("dropping record shorter than the handshake header");
        return None;
    }

    let mut reader = record;
    let header = HandshakeHeader::unmarshal(&mut reader).ok()?;

    if record.len() - HANDSHAKE_HEADER_LENGTH != header.fragment_length as usize {
        trace!("dropping record whose size does not match fragment_length");
        return None;
    }

    if header.message_sequence > next_receive_seq.wrapping_add(max_receive_ahead) {
        trace!(
            "dropping record with seq {} beyond the receive-ahead window",
            header.message_sequence
        );
        return None;
    }

    if header.fragment_offset + header.fragment_length > header.length {
        trace!("dropping record whose fragment exceeds the declared message length");
        return None;
    }

    Some(ParsedFragment {
        seq: header.message_sequence,
        typ: header.handshake_type,
        length: header.length,
        offset: header.fragment_offset,
        data: &record[HANDSHAKE_HEADER_LENGTH..],
    })
}

/// Installed by `finish()` on the side that sent the final flight. The
/// record layer invokes this for each incoming handshake record during its
/// post-finish grace window, once this struct's owner has stopped polling
/// `receive_message`.
struct PostFinishHook<R: RecordLayer> {
    record_layer: Arc<R>,
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl<R: RecordLayer + 'static> PostFinishRetransmitHook for PostFinishHook<R> {
    async fn on_handshake_record(&self, epoch: u16, record: &[u8]) -> Result<()> {
        // Handling a previous flight that spans two record-layer epochs is
        // explicitly out of scope (spec §9); this hook assumes a single
        // epoch for the retained previous flight and does not check it.
        let _ = epoch;

        let mut inner = self.inner.lock().await;
        let fragment = match parse_record(record, inner.next_receive_seq, 0) {
            Some(f) => f,
            None => return Ok(()),
        };

        if fragment.seq >= inner.next_receive_seq {
            return Ok(());
        }

        let previous = match inner.previous.as_mut() {
            Some(p) => p,
            None => return Ok(()),
        };

        if previous.get(fragment.seq).is_some() {
            previous
                .get_or_create(fragment.seq)
                .contribute_fragment(fragment.typ, fragment.length, fragment.offset, fragment.data)?;
        }

        if previous.all_complete() {
            debug!("post-finish: peer fully re-received its previous flight; resending");
            let outbound_snapshot = inner.outbound.clone();
            drop(inner);
            outbound::resend_outbound_flight(self.record_layer.as_ref(), &outbound_snapshot).await?;
            let mut inner = self.inner.lock().await;
            if let Some(previous) = inner.previous.as_mut() {
                previous.reset_all();
            }
        }

        Ok(())
    }
}
