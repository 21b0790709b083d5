//! Fragments a handshake message to the record layer's current send limit,
//! frames each fragment with the 12-byte handshake header, and writes each
//! as one atomic record. Keeps no state of its own: the outbound flight it
//! resends lives in the Flight Director.

use log::{trace, warn};

use crate::alert::AlertDescription;
use crate::error::{Error, Result};
use crate::flight::OutboundFlight;
use crate::handshake_header::{HandshakeHeader, HANDSHAKE_HEADER_LENGTH};
use crate::message::Message;
use crate::record_layer::RecordLayer;

/// Fragments and writes a single message. Always emits at least one
/// fragment, even for an empty body.
pub async fn write_message<R: RecordLayer + ?Sized>(record_layer: &R, msg: &Message) -> Result<()> {
    let send_limit = record_layer.get_send_limit();
    if send_limit <= HANDSHAKE_HEADER_LENGTH {
        warn!(
            "send limit {} too small to carry a single fragment byte",
            send_limit
        );
        return Err(Error::Fatal(AlertDescription::InternalError));
    }
    let max_fragment = send_limit - HANDSHAKE_HEADER_LENGTH;

    let length = msg.body.len() as u32;
    let mut offset: u32 = 0;
    loop {
        let remaining = (length - offset) as usize;
        let fragment_len = remaining.min(max_fragment);
        let fragment = &msg.body[offset as usize..offset as usize + fragment_len];

        let header = HandshakeHeader {
            handshake_type: msg.typ,
            length,
            message_sequence: msg.seq,
            fragment_offset: offset,
            fragment_length: fragment_len as u32,
        };

        let mut record = Vec::with_capacity(HANDSHAKE_HEADER_LENGTH + fragment_len);
        header.marshal(&mut record)?;
        record.extend_from_slice(fragment);

        trace!(
            "write seq={} type={} offset={} len={} of {}",
            msg.seq, msg.typ, offset, fragment_len, length
        );
        record_layer.send(&record).await?;

        offset += fragment_len as u32;
        if offset >= length {
            break;
        }
    }

    Ok(())
}

/// Re-sends every message of the outbound flight under the epoch it was
/// originally sent under. Each resend re-fragments to the *current* send
/// limit; handshake-header `seq`/`length` never change.
pub async fn resend_outbound_flight<R: RecordLayer + ?Sized>(
    record_layer: &R,
    outbound: &OutboundFlight,
) -> Result<()> {
    record_layer.reset_write_epoch().await;
    for msg in outbound.iter() {
        write_message(record_layer, msg).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Duration;

    use super::*;

    #[derive(Default)]
    struct RecordingLayer {
        send_limit: usize,
        sent: Mutex<Vec<Vec<u8>>>,
        epoch_resets: Mutex<u32>,
    }

    #[async_trait]
    impl RecordLayer for RecordingLayer {
        fn get_send_limit(&self) -> usize {
            self.send_limit
        }

        fn get_receive_limit(&self) -> usize {
            self.send_limit
        }

        async fn send(&self, buf: &[u8]) -> Result<()> {
            self.sent.lock().unwrap().push(buf.to_vec());
            Ok(())
        }

        async fn receive(&self, _buf: &mut [u8], _timeout: Duration) -> Result<Option<usize>> {
            Ok(None)
        }

        async fn reset_write_epoch(&self) {
            *self.epoch_resets.lock().unwrap() += 1;
        }

        async fn handshake_successful(
            &self,
            _hook: Option<Arc<dyn crate::record_layer::PostFinishRetransmitHook>>,
        ) {
        }
    }

    #[tokio::test]
    async fn fragments_to_the_send_limit() {
        let rl = RecordingLayer {
            send_limit: 25,
            ..Default::default()
        };
        let body: Vec<u8> = (0..30u8).collect();
        let msg = Message::new(0, 1, body.clone());

        write_message(&rl, &msg).await.unwrap();

        let sent = rl.sent.lock().unwrap();
        // 25 - 12 = 13 payload bytes per fragment; 30 bytes needs 3.
        assert_eq!(sent.len(), 3);
        let mut reassembled = Vec::new();
        for record in sent.iter() {
            let mut reader = &record[..];
            let header = HandshakeHeader::unmarshal(&mut reader).unwrap();
            assert_eq!(header.length, 30);
            reassembled.extend_from_slice(reader);
        }
        assert_eq!(reassembled, body);
    }

    #[tokio::test]
    async fn empty_body_still_emits_exactly_one_fragment() {
        let rl = RecordingLayer {
            send_limit: 200,
            ..Default::default()
        };
        let msg = Message::new(0, 20, vec![]);
        write_message(&rl, &msg).await.unwrap();

        let sent = rl.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), HANDSHAKE_HEADER_LENGTH);
    }

    #[tokio::test]
    async fn rejects_a_send_limit_too_small_for_the_header() {
        let rl = RecordingLayer {
            send_limit: 10,
            ..Default::default()
        };
        let msg = Message::new(0, 1, vec![1, 2, 3]);
        let err = write_message(&rl, &msg).await.unwrap_err();
        assert!(matches!(err, Error::Fatal(AlertDescription::InternalError)));
    }

    #[tokio::test]
    async fn resend_resets_the_write_epoch_once_and_resends_every_message() {
        let rl = RecordingLayer {
            send_limit: 200,
            ..Default::default()
        };
        let mut outbound = OutboundFlight::new();
        outbound.push(Message::new(0, 1, vec![1, 2, 3]));
        outbound.push(Message::new(1, 2, vec![4, 5]));

        resend_outbound_flight(&rl, &outbound).await.unwrap();

        assert_eq!(*rl.epoch_resets.lock().unwrap(), 1);
        assert_eq!(rl.sent.lock().unwrap().len(), 2);
    }
}
