//! Cast message parsing
//!
//! Reads control commands from a TCP stream and decodes UDP datagrams.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use crate::error::ProtocolError;
use crate::protocol::commands::{
    ControlCommand, DATAGRAM_HEADER_LEN, Datagram, DatagramOp, IDENTIFIER_LEN, OP_CHANGE_CHANNEL,
    OP_HEARTBEAT,
};

/// Reads the next control command from a client's stream.
///
/// A stream that ends before a full command is read yields `UnexpectedEof`,
/// which the handler treats as a disconnect.
pub async fn read_command<R>(reader: &mut R) -> io::Result<ControlCommand>
where
    R: AsyncRead + Unpin,
{
    let op = reader.read_u32().await?;
    match op {
        OP_HEARTBEAT => Ok(ControlCommand::Heartbeat),
        OP_CHANGE_CHANNEL => {
            let target = reader.read_u32().await?;
            Ok(ControlCommand::ChangeChannel(target))
        }
        other => Ok(ControlCommand::Unknown(other)),
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decodes one datagram. Everything after the header is the payload.
pub fn parse_datagram(buf: &[u8]) -> Result<Datagram<'_>, ProtocolError> {
    if buf.len() < DATAGRAM_HEADER_LEN {
        return Err(ProtocolError::Truncated {
            expected: DATAGRAM_HEADER_LEN,
            actual: buf.len(),
        });
    }

    let opcode = be_u32(&buf[0..4]);
    let op = DatagramOp::from_opcode(opcode).ok_or(ProtocolError::UnknownOpcode(opcode))?;
    let channel = be_u32(&buf[4..8]);

    let mut id = [0u8; IDENTIFIER_LEN];
    id.copy_from_slice(&buf[8..DATAGRAM_HEADER_LEN]);

    Ok(Datagram {
        op,
        channel,
        id: Uuid::from_bytes(id),
        payload: &buf[DATAGRAM_HEADER_LEN..],
    })
}
