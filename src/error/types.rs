//! Error types
//!
//! Defines domain-specific error types for the registry, the wire protocol
//! and server startup.

use std::fmt;
use std::io;

/// Channel registry errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidChannel { channel: usize, channel_count: usize },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidChannel {
                channel,
                channel_count,
            } => write!(
                f,
                "Invalid channel {} (registry holds {} channels)",
                channel, channel_count
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Wire protocol errors, shared by the control and data planes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    Truncated { expected: usize, actual: usize },
    UnknownOpcode(u32),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated { expected, actual } => write!(
                f,
                "Truncated message: expected at least {} bytes, got {}",
                expected, actual
            ),
            ProtocolError::UnknownOpcode(op) => write!(f, "Unknown opcode: {:#010x}", op),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Startup errors returned out of `main`
#[derive(Debug)]
pub enum CastServerError {
    Config(config::ConfigError),
    Bind { addr: String, source: io::Error },
    IoError(io::Error),
}

impl fmt::Display for CastServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastServerError::Config(e) => write!(f, "Configuration error: {}", e),
            CastServerError::Bind { addr, source } => {
                write!(f, "Failed to bind to {}: {}", addr, source)
            }
            CastServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CastServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CastServerError::Config(e) => Some(e),
            CastServerError::Bind { source, .. } => Some(source),
            CastServerError::IoError(e) => Some(e),
        }
    }
}

impl From<config::ConfigError> for CastServerError {
    fn from(error: config::ConfigError) -> Self {
        CastServerError::Config(error)
    }
}

impl From<io::Error> for CastServerError {
    fn from(error: io::Error) -> Self {
        CastServerError::IoError(error)
    }
}
