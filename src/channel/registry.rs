//! Module `registry`
//!
//! Provides the channel registry shared by every connection handler and the
//! datagram router. The registry is a fixed table of channels, each one an
//! independent membership list guarded by its own read/write lock, so work on
//! one channel never waits on another.

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::client::ClientNode;
use crate::error::RegistryError;

/// Membership list of a single channel, in join order.
pub type Members = Vec<Arc<ClientNode>>;

/// Fixed-size table of channel membership lists.
///
/// A live node is a member of exactly one channel at a time, and its
/// `channel()` always names that channel.
pub struct ChannelRegistry {
    channels: Vec<RwLock<Members>>,
}

impl ChannelRegistry {
    /// Number of channels allocated when no configuration overrides it.
    pub const DEFAULT_CHANNEL_COUNT: usize = 10_000;

    /// Allocates `channel_count` empty channels. The table is never resized.
    pub fn new(channel_count: usize) -> Self {
        let channels = (0..channel_count).map(|_| RwLock::new(Vec::new())).collect();
        debug!("Allocated {} channel lists", channel_count);
        Self { channels }
    }

    /// Returns the number of channels in the table.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Checks whether `channel` is a valid index into the table.
    pub fn is_valid(&self, channel: usize) -> bool {
        channel < self.channels.len()
    }

    fn slot(&self, channel: usize, action: &str) -> Result<&RwLock<Members>, RegistryError> {
        self.channels.get(channel).ok_or_else(|| {
            warn!("Invalid channel to {}: {}", action, channel);
            RegistryError::InvalidChannel {
                channel,
                channel_count: self.channels.len(),
            }
        })
    }

    /// Inserts `node` into `channel` and records the channel on the node.
    ///
    /// The caller guarantees the node is not a member of any channel.
    pub async fn add(&self, channel: usize, node: Arc<ClientNode>) -> Result<(), RegistryError> {
        let slot = self.slot(channel, "add")?;
        let mut members = slot.write().await;
        node.set_channel(channel);
        info!("Added client {} to channel {}", node.id(), channel);
        members.push(node);
        Ok(())
    }

    /// Removes `node` from `channel`.
    ///
    /// Returns `Ok(false)` and leaves the list untouched when the node is not a member.
    pub async fn remove(&self, channel: usize, node: &ClientNode) -> Result<bool, RegistryError> {
        let slot = self.slot(channel, "remove")?;
        let mut members = slot.write().await;
        match members.iter().position(|member| member.id() == node.id()) {
            Some(index) => {
                members.remove(index);
                info!("Removed client {} from channel {}", node.id(), channel);
                Ok(true)
            }
            None => {
                warn!(
                    "Cannot remove client {}: not a member of channel {}",
                    node.id(),
                    channel
                );
                Ok(false)
            }
        }
    }

    /// Looks up a member of `channel` by identifier.
    pub async fn find(
        &self,
        channel: usize,
        id: &Uuid,
    ) -> Result<Option<Arc<ClientNode>>, RegistryError> {
        let slot = self.slot(channel, "search")?;
        let members = slot.read().await;
        let found = members.iter().find(|member| member.id() == *id).cloned();

        if found.is_some() {
            debug!("Found client {} at channel {}", id, channel);
        } else {
            debug!("Cannot find client {} at channel {}", id, channel);
        }
        Ok(found)
    }

    /// Applies `f` to every member of `channel` under the shared lock.
    ///
    /// Returns the number of members visited.
    pub async fn iterate<F>(&self, channel: usize, mut f: F) -> Result<usize, RegistryError>
    where
        F: FnMut(&Arc<ClientNode>),
    {
        let slot = self.slot(channel, "iterate")?;
        let members = slot.read().await;
        members.iter().for_each(&mut f);
        Ok(members.len())
    }

    /// Returns the shared guard over `channel`'s members.
    ///
    /// Writers to this channel wait until the guard is dropped.
    pub async fn members(
        &self,
        channel: usize,
    ) -> Result<RwLockReadGuard<'_, Members>, RegistryError> {
        let slot = self.slot(channel, "read")?;
        Ok(slot.read().await)
    }

    /// Returns the number of members in `channel`.
    pub async fn len(&self, channel: usize) -> Result<usize, RegistryError> {
        let slot = self.slot(channel, "count")?;
        Ok(slot.read().await.len())
    }

    /// Moves `node` from its current channel to `target` in one step.
    ///
    /// Both write locks are held for the whole move, taken lower index first,
    /// so no reader can observe the node in neither or both channels. Only
    /// the node's own connection handler may move or remove it, which keeps
    /// `node.channel()` stable while the locks are acquired.
    ///
    /// A node that is not a member of its recorded channel is left alone.
    pub async fn move_node(
        &self,
        node: &Arc<ClientNode>,
        target: usize,
    ) -> Result<(), RegistryError> {
        let source = node.channel();
        let source_slot = self.slot(source, "move from")?;
        let target_slot = self.slot(target, "move to")?;

        if source == target {
            return Ok(());
        }

        let (mut from, mut to) = if source < target {
            let from = source_slot.write().await;
            let to = target_slot.write().await;
            (from, to)
        } else {
            let to = target_slot.write().await;
            let from = source_slot.write().await;
            (from, to)
        };

        let Some(index) = from.iter().position(|member| member.id() == node.id()) else {
            warn!(
                "Client {} was not a member of channel {} while moving",
                node.id(),
                source
            );
            return Ok(());
        };
        from.remove(index);
        to.push(Arc::clone(node));
        node.set_channel(target);

        info!(
            "Moved client {} from channel {} to channel {}",
            node.id(),
            source,
            target
        );
        Ok(())
    }

    /// Logs every member of `channel` and returns the member count.
    pub async fn dump(&self, channel: usize) -> Result<usize, RegistryError> {
        let mut index = 0;
        let count = self
            .iterate(channel, |node| {
                index += 1;
                match node.delivery_addr() {
                    Some(addr) => info!(
                        "Channel: {}, Index: {}, Entry: {} (control {}, delivery {})",
                        channel,
                        index,
                        node.id(),
                        node.remote_addr(),
                        addr
                    ),
                    None => info!(
                        "Channel: {}, Index: {}, Entry: {} (control {}, no delivery address)",
                        channel,
                        index,
                        node.id(),
                        node.remote_addr()
                    ),
                }
            })
            .await?;
        info!("Channel: {} holds {} clients", channel, count);
        Ok(count)
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHANNEL_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn node() -> Arc<ClientNode> {
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        Arc::new(ClientNode::new(Uuid::new_v4(), addr))
    }

    async fn memberships(registry: &ChannelRegistry, id: Uuid) -> Vec<usize> {
        let mut found = Vec::new();
        for channel in 0..registry.channel_count() {
            if registry.find(channel, &id).await.unwrap().is_some() {
                found.push(channel);
            }
        }
        found
    }

    #[tokio::test]
    async fn test_new_registry_is_empty() {
        let registry = ChannelRegistry::new(8);
        assert_eq!(registry.channel_count(), 8);
        for channel in 0..8 {
            assert_eq!(registry.len(channel).await.unwrap(), 0);
        }
        assert_eq!(
            ChannelRegistry::default().channel_count(),
            ChannelRegistry::DEFAULT_CHANNEL_COUNT
        );
    }

    #[tokio::test]
    async fn test_add_and_find() {
        let registry = ChannelRegistry::new(4);
        let client = node();

        registry.add(2, Arc::clone(&client)).await.unwrap();

        let found = registry.find(2, &client.id()).await.unwrap();
        assert!(found.is_some_and(|n| Arc::ptr_eq(&n, &client)));
        assert!(registry.find(0, &client.id()).await.unwrap().is_none());
        assert_eq!(client.channel(), 2);
    }

    #[tokio::test]
    async fn test_invalid_channel_is_rejected() {
        let registry = ChannelRegistry::new(4);
        let client = node();
        let expected = RegistryError::InvalidChannel {
            channel: 4,
            channel_count: 4,
        };

        assert_eq!(registry.add(4, Arc::clone(&client)).await, Err(expected.clone()));
        assert_eq!(registry.remove(4, &client).await, Err(expected.clone()));
        assert_eq!(
            registry.find(4, &client.id()).await.map(|n| n.is_some()),
            Err(expected.clone())
        );
        assert_eq!(registry.iterate(4, |_| {}).await, Err(expected));
        assert!(registry.members(usize::MAX).await.is_err());
        assert_eq!(memberships(&registry, client.id()).await, Vec::<usize>::new());
    }

    #[tokio::test]
    async fn test_remove_absent_node_is_noop() {
        let registry = ChannelRegistry::new(4);
        let member = node();
        let stranger = node();
        registry.add(1, Arc::clone(&member)).await.unwrap();

        assert_eq!(registry.remove(1, &stranger).await, Ok(false));
        assert_eq!(registry.len(1).await.unwrap(), 1);
        assert!(registry.find(1, &stranger.id()).await.unwrap().is_none());

        assert_eq!(registry.remove(1, &member).await, Ok(true));
        assert_eq!(registry.remove(1, &member).await, Ok(false));
        assert_eq!(registry.len(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_move_node() {
        let registry = ChannelRegistry::new(10);
        let client = node();
        registry.add(0, Arc::clone(&client)).await.unwrap();

        registry.move_node(&client, 5).await.unwrap();
        assert!(registry.find(0, &client.id()).await.unwrap().is_none());
        assert!(registry.find(5, &client.id()).await.unwrap().is_some());
        assert_eq!(client.channel(), 5);

        registry.move_node(&client, 3).await.unwrap();
        assert_eq!(memberships(&registry, client.id()).await, vec![3]);
        assert_eq!(client.channel(), 3);
    }

    #[tokio::test]
    async fn test_move_to_same_or_invalid_channel() {
        let registry = ChannelRegistry::new(4);
        let client = node();
        registry.add(1, Arc::clone(&client)).await.unwrap();

        registry.move_node(&client, 1).await.unwrap();
        assert_eq!(registry.len(1).await.unwrap(), 1);

        assert!(registry.move_node(&client, 9).await.is_err());
        assert_eq!(memberships(&registry, client.id()).await, vec![1]);
        assert_eq!(client.channel(), 1);
    }

    #[tokio::test]
    async fn test_move_of_unregistered_node_adds_nothing() {
        let registry = ChannelRegistry::new(4);
        let stray = node();

        registry.move_node(&stray, 3).await.unwrap();

        assert!(memberships(&registry, stray.id()).await.is_empty());
        assert_eq!(stray.channel(), 0);
    }

    #[tokio::test]
    async fn test_iterate_visits_members_in_join_order() {
        let registry = ChannelRegistry::new(2);
        let clients: Vec<_> = (0..3).map(|_| node()).collect();
        for client in &clients {
            registry.add(1, Arc::clone(client)).await.unwrap();
        }

        let mut seen = Vec::new();
        let count = registry.iterate(1, |n| seen.push(n.id())).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(seen, clients.iter().map(|c| c.id()).collect::<Vec<_>>());
        assert_eq!(registry.dump(1).await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_moves_keep_single_membership() {
        let registry = Arc::new(ChannelRegistry::new(4));
        let mut clients = Vec::new();
        for _ in 0..16 {
            let client = node();
            registry.add(0, Arc::clone(&client)).await.unwrap();
            clients.push(client);
        }

        let mut tasks = Vec::new();
        for (i, client) in clients.iter().enumerate() {
            let registry = Arc::clone(&registry);
            let client = Arc::clone(client);
            tasks.push(tokio::spawn(async move {
                for step in 0..50 {
                    let target = (i + step) % 4;
                    registry.move_node(&client, target).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let mut total = 0;
        for channel in 0..4 {
            total += registry.len(channel).await.unwrap();
        }
        assert_eq!(total, clients.len());

        for client in &clients {
            assert_eq!(memberships(&registry, client.id()).await, vec![client.channel()]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reader_never_sees_moving_node_missing() {
        let registry = Arc::new(ChannelRegistry::new(2));
        let client = node();
        registry.add(0, Arc::clone(&client)).await.unwrap();

        let mover = {
            let registry = Arc::clone(&registry);
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                for step in 0..200 {
                    registry.move_node(&client, (step + 1) % 2).await.unwrap();
                }
            })
        };

        // Holding channel 0 while reading channel 1 pins the node in place.
        for _ in 0..200 {
            let first = registry.members(0).await.unwrap();
            let second = registry.members(1).await.unwrap();
            let count = first.iter().chain(second.iter()).filter(|n| n.id() == client.id()).count();
            assert_eq!(count, 1);
            drop(second);
            drop(first);
            tokio::task::yield_now().await;
        }

        mover.await.unwrap();
    }
}
