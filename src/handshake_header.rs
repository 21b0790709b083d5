use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;

// msg_len for Handshake messages assumes an extra 12 bytes for
// sequence, fragment and version information
pub const HANDSHAKE_HEADER_LENGTH: usize = 12;

/// DTLS reserves handshake type 0 for HelloRequest, which is out-of-sequence
/// signalling and never participates in the handshake transcript.
pub const HELLO_REQUEST: u8 = 0;

// https://tools.ietf.org/html/rfc6347#section-4.2.2
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct HandshakeHeader {
    pub handshake_type: u8,
    pub length: u32,           // uint24 in spec
    pub message_sequence: u16,
    pub fragment_offset: u32,  // uint24 in spec
    pub fragment_length: u32,  // uint24 in spec
}

impl HandshakeHeader {
    pub fn size(&self) -> usize {
        HANDSHAKE_HEADER_LENGTH
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.handshake_type)?;
        writer.write_u24::<BigEndian>(self.length)?;
        writer.write_u16::<BigEndian>(self.message_sequence)?;
        writer.write_u24::<BigEndian>(self.fragment_offset)?;
        writer.write_u24::<BigEndian>(self.fragment_length)?;

        Ok(writer.flush()?)
    }

    pub fn unmarshal<R: Read>(reader: &mut R) -> Result<Self> {
        let handshake_type = reader.read_u8()?;
        let length = reader.read_u24::<BigEndian>()?;
        let message_sequence = reader.read_u16::<BigEndian>()?;
        let fragment_offset = reader.read_u24::<BigEndian>()?;
        let fragment_length = reader.read_u24::<BigEndian>()?;

        Ok(HandshakeHeader {
            handshake_type,
            length,
            message_sequence,
            fragment_offset,
            fragment_length,
        })
    }
}
