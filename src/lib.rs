pub mod channel;
pub mod client;
pub mod config;
pub mod console;
pub mod datagram;
pub mod error;
pub mod protocol;
pub mod server;
pub mod utils;

pub use channel::ChannelRegistry;
pub use server::Server;
