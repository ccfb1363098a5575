//! Data plane
//!
//! The single UDP socket shared by all clients, and the router that fans
//! broadcast payloads out to channel members.

pub mod router;

pub use router::{DatagramRouter, RouteOutcome, RouterConfig};
