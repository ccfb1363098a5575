//! Control command handlers
//!
//! Applies a client's control commands to its own membership in the
//! channel registry. A handler only ever touches the node it was given.

use log::{trace, warn};
use std::sync::Arc;

use crate::channel::ChannelRegistry;
use crate::client::ClientNode;
use crate::protocol::{CommandStatus, ControlCommand};

/// Dispatches a control command for `node`.
///
/// Unknown opcodes end the session; everything else keeps it open.
pub async fn handle_command(
    node: &Arc<ClientNode>,
    command: &ControlCommand,
    registry: &ChannelRegistry,
) -> CommandStatus {
    match command {
        ControlCommand::Heartbeat => {
            trace!("Heartbeat from client {}", node.id());
            CommandStatus::Continue
        }
        ControlCommand::ChangeChannel(target) => {
            handle_change_channel(node, *target as usize, registry).await
        }
        ControlCommand::Unknown(op) => {
            warn!(
                "Broken data from client {}: unknown opcode {:#010x}",
                node.id(),
                op
            );
            CommandStatus::CloseConnection
        }
    }
}

/// Handles a channel change. Naming the current channel is a stream heartbeat.
async fn handle_change_channel(
    node: &Arc<ClientNode>,
    target: usize,
    registry: &ChannelRegistry,
) -> CommandStatus {
    if target == node.channel() {
        trace!("Stream heartbeat from client {}", node.id());
    } else if registry.is_valid(target) {
        if let Err(e) = registry.move_node(node, target).await {
            warn!("Channel change failed for client {}: {}", node.id(), e);
        }
    } else {
        warn!(
            "Invalid channel info from client {}: {} (registry holds {})",
            node.id(),
            target,
            registry.channel_count()
        );
    }
    CommandStatus::Continue
}
