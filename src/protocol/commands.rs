//! Module `commands`
//!
//! Defines the opcodes and message types of the cast protocol.
//!
//! Control plane (TCP): the server first sends the 16 raw bytes of the
//! client identifier. The client then sends 4-byte big-endian opcodes, `'h'`
//! alone or `'c'` followed by a 4-byte big-endian channel index.
//!
//! Data plane (UDP): `[opcode u32 BE][channel u32 BE][identifier 16 bytes][payload]`
//! where the opcode is `'u'` (register) or `'b'` (broadcast).

use uuid::Uuid;

/// Control-plane heartbeat.
pub const OP_HEARTBEAT: u32 = b'h' as u32;
/// Control-plane channel change, followed by the target channel.
pub const OP_CHANGE_CHANNEL: u32 = b'c' as u32;
/// Data-plane registration of the sender's delivery address.
pub const OP_REGISTER: u32 = b'u' as u32;
/// Data-plane broadcast of the payload to the channel.
pub const OP_BROADCAST: u32 = b'b' as u32;

/// Length of a client identifier on the wire.
pub const IDENTIFIER_LEN: usize = 16;
/// Opcode, channel and identifier preceding every datagram payload.
pub const DATAGRAM_HEADER_LEN: usize = 4 + 4 + IDENTIFIER_LEN;

/// A message read from a client's control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Heartbeat,
    ChangeChannel(u32),
    Unknown(u32),
}

impl ControlCommand {
    /// Encodes the command the way a client sends it.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ControlCommand::Heartbeat => OP_HEARTBEAT.to_be_bytes().to_vec(),
            ControlCommand::ChangeChannel(target) => {
                let mut buf = OP_CHANGE_CHANNEL.to_be_bytes().to_vec();
                buf.extend_from_slice(&target.to_be_bytes());
                buf
            }
            ControlCommand::Unknown(op) => op.to_be_bytes().to_vec(),
        }
    }
}

/// What the connection handler does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Continue,
    CloseConnection,
}

/// Data-plane operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramOp {
    Register,
    Broadcast,
}

impl DatagramOp {
    pub fn from_opcode(op: u32) -> Option<Self> {
        match op {
            OP_REGISTER => Some(DatagramOp::Register),
            OP_BROADCAST => Some(DatagramOp::Broadcast),
            _ => None,
        }
    }

    pub fn opcode(self) -> u32 {
        match self {
            DatagramOp::Register => OP_REGISTER,
            DatagramOp::Broadcast => OP_BROADCAST,
        }
    }
}

/// A parsed data-plane packet borrowing its payload from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram<'a> {
    pub op: DatagramOp,
    pub channel: u32,
    pub id: Uuid,
    pub payload: &'a [u8],
}

impl<'a> Datagram<'a> {
    pub fn register(channel: u32, id: Uuid) -> Self {
        Self {
            op: DatagramOp::Register,
            channel,
            id,
            payload: &[],
        }
    }

    pub fn broadcast(channel: u32, id: Uuid, payload: &'a [u8]) -> Self {
        Self {
            op: DatagramOp::Broadcast,
            channel,
            id,
            payload,
        }
    }

    /// Encodes the datagram the way a client sends it.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DATAGRAM_HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.op.opcode().to_be_bytes());
        buf.extend_from_slice(&self.channel.to_be_bytes());
        buf.extend_from_slice(self.id.as_bytes());
        buf.extend_from_slice(self.payload);
        buf
    }
}
