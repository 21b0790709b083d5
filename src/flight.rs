//! Flight-scoped bookkeeping: the outbound flight (messages this side has
//! sent, kept verbatim for retransmission) and an inbound flight table
//! (per-seq reassemblers). Two inbound tables coexist in the Flight
//! Director: `current` (the flight being received) and `previous` (the
//! flight received right before the current outbound flight was sent).

use std::collections::HashMap;

use crate::message::Message;
use crate::reassembler::Reassembler;

/// The most recent flight this side has sent, preserved verbatim so it can
/// be retransmitted without re-deriving message bytes.
#[derive(Clone, Debug, Default)]
pub struct OutboundFlight {
    messages: Vec<Message>,
}

impl OutboundFlight {
    pub fn new() -> Self {
        OutboundFlight {
            messages: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// `seq -> Reassembler`, bounding memory to `MAX_RECEIVE_AHEAD + 1`
/// outstanding reassemblers when used as the "current" table.
#[derive(Default)]
pub struct InboundFlightTable {
    reassemblers: HashMap<u16, Reassembler>,
    max_message_length: u32,
}

impl InboundFlightTable {
    pub fn new(max_message_length: u32) -> Self {
        InboundFlightTable {
            reassemblers: HashMap::new(),
            max_message_length,
        }
    }

    pub fn get(&self, seq: u16) -> Option<&Reassembler> {
        self.reassemblers.get(&seq)
    }

    pub fn get_or_create(&mut self, seq: u16) -> &mut Reassembler {
        self.reassemblers
            .entry(seq)
            .or_insert_with(|| Reassembler::new(self.max_message_length))
    }

    pub fn is_empty(&self) -> bool {
        self.reassemblers.is_empty()
    }

    pub fn reset_all(&mut self) {
        for r in self.reassemblers.values_mut() {
            r.reset();
        }
    }

    /// All reassemblers (i.e. every seq of the flight) report complete.
    pub fn all_complete(&self) -> bool {
        !self.reassemblers.is_empty()
            && self
                .reassemblers
                .values()
                .all(|r| r.body_if_complete().is_some())
    }

    pub fn take(&mut self) -> InboundFlightTable {
        std::mem::replace(self, InboundFlightTable::new(self.max_message_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_complete_is_false_when_empty() {
        let table = InboundFlightTable::new(1024);
        assert!(!table.all_complete());
    }

    #[test]
    fn all_complete_requires_every_reassembler_done() {
        let mut table = InboundFlightTable::new(1024);
        table
            .get_or_create(0)
            .contribute_fragment(1, 4, 0, &[1, 2, 3, 4])
            .unwrap();
        table.get_or_create(1);
        assert!(!table.all_complete());

        table
            .get_or_create(1)
            .contribute_fragment(2, 2, 0, &[5, 6])
            .unwrap();
        assert!(table.all_complete());
    }

    #[test]
    fn take_leaves_an_empty_table_behind() {
        let mut table = InboundFlightTable::new(1024);
        table.get_or_create(0);
        let taken = table.take();
        assert!(!taken.is_empty());
        assert!(table.is_empty());
    }
}
