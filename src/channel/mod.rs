//! Channel membership
//!
//! Holds the fixed-size table of channels and the clients currently
//! subscribed to each of them.

pub mod registry;

pub use registry::{ChannelRegistry, Members};
