//! Module `router`
//!
//! Owns the data-plane UDP socket. A single receive loop parses every
//! datagram, records delivery addresses for `register` packets and fans
//! `broadcast` payloads out to the members of the named channel.
//!
//! Fan-out is synchronous: one `send_to` per member while the channel's
//! read lock is held, before the next datagram is read.

use log::{debug, info, trace, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

use crate::channel::ChannelRegistry;
use crate::client::ClientNode;
use crate::config::StartupConfig;
use crate::protocol::{Datagram, DatagramOp, parse_datagram};

/// Router settings taken from the startup configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Receive buffer size; longer datagrams are truncated.
    pub max_datagram_size: usize,
    /// Skip the sender when fanning out its own broadcast.
    pub exclude_sender: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_datagram_size: 32768,
            exclude_sender: false,
        }
    }
}

impl From<&StartupConfig> for RouterConfig {
    fn from(config: &StartupConfig) -> Self {
        Self {
            max_datagram_size: config.max_datagram_size,
            exclude_sender: config.exclude_sender,
        }
    }
}

/// What happened to one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// First registration of the sender's delivery address.
    Registered,
    /// Repeat registration; the address was overwritten.
    Refreshed,
    /// Broadcast forwarded to this many members.
    Delivered(usize),
    /// Malformed, unknown sender or invalid channel.
    Dropped,
}

pub struct DatagramRouter {
    socket: UdpSocket,
    registry: Arc<ChannelRegistry>,
    config: RouterConfig,
}

impl DatagramRouter {
    /// Binds the data-plane socket.
    pub async fn bind(
        addr: &str,
        registry: Arc<ChannelRegistry>,
        config: RouterConfig,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Datagram router bound to {}", socket.local_addr()?);
        Ok(Self {
            socket,
            registry,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives and routes datagrams forever. Errors are logged and the
    /// loop carries on.
    pub async fn run(self) {
        info!(
            "Started datagram router (buffer {} bytes, exclude sender: {})",
            self.config.max_datagram_size, self.config.exclude_sender
        );
        let mut buf = vec![0u8; self.config.max_datagram_size];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, source)) => {
                    self.handle_datagram(&buf[..len], source).await;
                }
                Err(e) => warn!("Failed to receive datagram: {}", e),
            }
        }
    }

    /// Routes one datagram received from `source`.
    pub async fn handle_datagram(&self, packet: &[u8], source: SocketAddr) -> RouteOutcome {
        let datagram = match parse_datagram(packet) {
            Ok(datagram) => datagram,
            Err(e) => {
                warn!("Broken packet from {}: {}", source, e);
                return RouteOutcome::Dropped;
            }
        };

        debug!(
            "Read {} bytes from {}: op={:?}, ch={}, id={}",
            packet.len(),
            source,
            datagram.op,
            datagram.channel,
            datagram.id
        );

        match datagram.op {
            DatagramOp::Register => self.register(&datagram, source).await,
            DatagramOp::Broadcast => self.broadcast(&datagram).await,
        }
    }

    /// Finds the member named by the datagram, or logs why it is unknown.
    async fn lookup(&self, datagram: &Datagram<'_>) -> Option<Arc<ClientNode>> {
        match self
            .registry
            .find(datagram.channel as usize, &datagram.id)
            .await
        {
            Ok(Some(node)) => Some(node),
            Ok(None) => {
                warn!(
                    "Broken packet: client {} is not a member of channel {}",
                    datagram.id, datagram.channel
                );
                None
            }
            Err(e) => {
                warn!("Broken packet from client {}: {}", datagram.id, e);
                None
            }
        }
    }

    async fn register(&self, datagram: &Datagram<'_>, source: SocketAddr) -> RouteOutcome {
        let Some(node) = self.lookup(datagram).await else {
            return RouteOutcome::Dropped;
        };

        match node.set_delivery_addr(source) {
            None => {
                info!(
                    "Initialized datagram entry of client {} at {}",
                    node.id(),
                    source
                );
                RouteOutcome::Registered
            }
            Some(previous) if previous == source => {
                trace!("Datagram heartbeat from client {}", node.id());
                RouteOutcome::Refreshed
            }
            Some(previous) => {
                info!(
                    "Client {} moved its datagram entry from {} to {}",
                    node.id(),
                    previous,
                    source
                );
                RouteOutcome::Refreshed
            }
        }
    }

    async fn broadcast(&self, datagram: &Datagram<'_>) -> RouteOutcome {
        let Some(sender) = self.lookup(datagram).await else {
            return RouteOutcome::Dropped;
        };
        let members = match self.registry.members(datagram.channel as usize).await {
            Ok(members) => members,
            Err(e) => {
                warn!("Broadcast from client {} dropped: {}", sender.id(), e);
                return RouteOutcome::Dropped;
            }
        };

        trace!(
            "Broadcasting {} bytes to channel {} from {}",
            datagram.payload.len(),
            datagram.channel,
            sender.id()
        );

        let mut delivered = 0;
        for member in members.iter() {
            if self.config.exclude_sender && member.id() == sender.id() {
                continue;
            }
            let Some(addr) = member.delivery_addr() else {
                continue;
            };
            match self.socket.send_to(datagram.payload, addr).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(
                    "Failed to deliver broadcast to client {} at {}: {}",
                    member.id(),
                    addr,
                    e
                ),
            }
        }
        RouteOutcome::Delivered(delivered)
    }
}
