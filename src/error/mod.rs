//! Error handling
//!
//! Defines error types and handling for the cast server.

pub mod handlers;
pub mod types;

pub use handlers::{handle_error, is_disconnect};
pub use types::*;
