//! Module `state`
//!
//! Defines the `ClientNode` struct: the server-side record of one connected
//! client, shared between its connection handler, the channel registry and
//! the datagram router.

use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Represents one connected client.
///
/// The identifier and control address are fixed for the lifetime of the
/// connection. The channel, delivery address and activity timestamp are
/// interior-mutable so the node can be shared behind an `Arc`.
#[derive(Debug)]
pub struct ClientNode {
    id: Uuid,
    remote_addr: SocketAddr,
    channel: AtomicUsize,
    delivery_addr: RwLock<Option<SocketAddr>>,
    last_active: Mutex<Instant>,
}

impl ClientNode {
    /// Creates a node for a freshly accepted connection, homed in channel 0
    /// with no delivery address yet.
    pub fn new(id: Uuid, remote_addr: SocketAddr) -> Self {
        Self {
            id,
            remote_addr,
            channel: AtomicUsize::new(0),
            delivery_addr: RwLock::new(None),
            last_active: Mutex::new(Instant::now()),
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    /// Returns the identifier assigned at connect time.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the TCP peer address of the control connection.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Returns the channel whose membership list currently owns this node.
    pub fn channel(&self) -> usize {
        self.channel.load(Ordering::Acquire)
    }

    /// Returns the UDP address broadcasts are delivered to, if registered.
    pub fn delivery_addr(&self) -> Option<SocketAddr> {
        *self.delivery_addr.read()
    }

    /// Returns whether the client has registered a delivery address.
    pub fn has_delivery_addr(&self) -> bool {
        self.delivery_addr.read().is_some()
    }

    /// Returns the time elapsed since the last control-plane message.
    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }

    // --------------------
    // Setter methods
    // --------------------

    /// Records the owning channel. Only the registry calls this, while it
    /// holds the write lock of that channel.
    pub(crate) fn set_channel(&self, channel: usize) {
        self.channel.store(channel, Ordering::Release);
    }

    /// Sets or overwrites the delivery address.
    ///
    /// Returns the previous address; once set it is never cleared.
    pub fn set_delivery_addr(&self, addr: SocketAddr) -> Option<SocketAddr> {
        self.delivery_addr.write().replace(addr)
    }

    /// Refreshes the activity timestamp.
    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }
}

impl PartialEq for ClientNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClientNode {}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> ClientNode {
        ClientNode::new(Uuid::new_v4(), "127.0.0.1:40000".parse().unwrap())
    }

    #[test]
    fn test_new_node_defaults() {
        let node = node();
        assert_eq!(node.channel(), 0);
        assert!(node.delivery_addr().is_none());
        assert!(!node.has_delivery_addr());
    }

    #[test]
    fn test_delivery_addr_is_overwritten_not_cleared() {
        let node = node();
        let first: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let second: SocketAddr = "127.0.0.1:5001".parse().unwrap();

        assert_eq!(node.set_delivery_addr(first), None);
        assert_eq!(node.set_delivery_addr(second), Some(first));
        assert_eq!(node.delivery_addr(), Some(second));
    }

    #[test]
    fn test_touch_resets_idle_time() {
        let node = node();
        std::thread::sleep(Duration::from_millis(50));
        assert!(node.idle_for() >= Duration::from_millis(50));
        node.touch();
        assert!(node.idle_for() < Duration::from_millis(50));
    }

    #[test]
    fn test_nodes_compare_by_id() {
        let id = Uuid::new_v4();
        let a = ClientNode::new(id, "127.0.0.1:1".parse().unwrap());
        let b = ClientNode::new(id, "127.0.0.1:2".parse().unwrap());
        assert_eq!(a, b);
        assert_ne!(a, node());
    }
}
