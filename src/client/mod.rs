//! Client management
//!
//! Holds the per-client node record and the task that serves one client's
//! control connection.

pub mod handler;
pub mod state;

pub use handler::handle_client;
pub use state::ClientNode;
