use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::channel::ChannelRegistry;
use crate::client::ClientNode;
use crate::error::is_disconnect;
use crate::protocol::{CommandStatus, handle_command, read_command};

/// Serves one client's control connection until it ends.
///
/// - Reads opcodes with `read_command` and applies them with `handle_command`.
/// - Any read failure, short read or unknown opcode ends the session.
/// - On exit the node leaves its channel and the connection is closed.
///   Nothing from this client is processed afterwards.
pub async fn handle_client(
    stream: TcpStream,
    node: Arc<ClientNode>,
    registry: Arc<ChannelRegistry>,
) {
    info!("Client {} connected at {}", node.id(), node.remote_addr());

    let mut reader = BufReader::new(stream);

    loop {
        match read_command(&mut reader).await {
            Ok(command) => {
                node.touch();
                debug!("Received from client {}: {:?}", node.id(), command);

                match handle_command(&node, &command, &registry).await {
                    CommandStatus::Continue => continue,
                    CommandStatus::CloseConnection => {
                        info!("Closing connection of client {}", node.id());
                        break;
                    }
                }
            }
            Err(e) if is_disconnect(&e) => {
                info!("Connection closed by client {}", node.id());
                break;
            }
            Err(e) => {
                error!("Failed to read from client {}: {}", node.id(), e);
                break;
            }
        }
    }

    if let Err(e) = registry.remove(node.channel(), &node).await {
        warn!("Failed to unregister client {}: {}", node.id(), e);
    }
    let _ = reader.get_mut().shutdown().await;
    info!("Client {} disconnected", node.id());
}
