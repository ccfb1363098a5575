//! Error handlers
//!
//! Provides error reporting and classification of transport failures.

use crate::error::types::CastServerError;
use log::error;
use std::io;

/// Log a server error
pub fn handle_error(err: &CastServerError) {
    error!("Cast server error: {}", err);
}

/// Returns true when an I/O error means the peer simply went away.
///
/// Such errors end a session normally rather than being reported as failures.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}
