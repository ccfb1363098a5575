//! Server core functionality
//!
//! This module contains the control listener that accepts clients, issues
//! their identifiers and starts one handler task per connection.

pub mod core;

pub use core::Server;
