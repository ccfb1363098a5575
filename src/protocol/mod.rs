//! Cast wire protocol
//!
//! Opcodes and message layouts for the TCP control plane and the UDP data
//! plane, their parsers, and the control-command handlers.

pub mod commands;
pub mod handlers;
pub mod parser;

pub use commands::{
    CommandStatus, ControlCommand, DATAGRAM_HEADER_LEN, Datagram, DatagramOp, IDENTIFIER_LEN,
};
pub use handlers::handle_command;
pub use parser::{parse_datagram, read_command};
