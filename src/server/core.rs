use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

use crate::channel::ChannelRegistry;
use crate::client::{ClientNode, handle_client};
use crate::config::StartupConfig;
use crate::datagram::{DatagramRouter, RouterConfig};
use crate::error::CastServerError;

/// Channel every client joins on connect.
const LOBBY_CHANNEL: usize = 0;

/// The cast server: one TCP control listener and one UDP datagram router
/// sharing a single channel registry.
pub struct Server {
    registry: Arc<ChannelRegistry>,
    listener: TcpListener,
    router: DatagramRouter,
    config: StartupConfig,
}

impl Server {
    /// Allocates the registry and binds both sockets.
    ///
    /// Failing to bind either port is fatal.
    pub async fn bind(config: StartupConfig) -> Result<Self, CastServerError> {
        let registry = Arc::new(ChannelRegistry::new(config.channel_count));

        let control_socket = config.control_socket();
        let listener = match TcpListener::bind(&control_socket).await {
            Ok(listener) => {
                info!("Control listener bound to {}", listener.local_addr()?);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", control_socket, e);
                return Err(CastServerError::Bind {
                    addr: control_socket,
                    source: e,
                });
            }
        };

        let data_socket = config.data_socket();
        let router = DatagramRouter::bind(
            &data_socket,
            Arc::clone(&registry),
            RouterConfig::from(&config),
        )
        .await
        .map_err(|e| {
            error!("Failed to bind to {}: {}", data_socket, e);
            CastServerError::Bind {
                addr: data_socket.clone(),
                source: e,
            }
        })?;

        Ok(Self {
            registry,
            listener,
            router,
            config,
        })
    }

    pub fn control_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn data_addr(&self) -> io::Result<SocketAddr> {
        self.router.local_addr()
    }

    /// Returns a handle to the shared channel registry.
    pub fn registry(&self) -> Arc<ChannelRegistry> {
        Arc::clone(&self.registry)
    }

    /// Starts the datagram router and accepts control connections forever.
    pub async fn start(self) {
        let Server {
            registry,
            listener,
            router,
            config,
        } = self;

        info!(
            "Starting cast server on {} (control) / {} (data) with {} channels",
            config.control_socket(),
            config.data_socket(),
            registry.channel_count()
        );

        tokio::spawn(router.run());

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let registry = Arc::clone(&registry);

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        handle_new_client(stream, addr, registry).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Handles a new client: sends its identifier, registers it in the lobby
/// channel and hands off to the session handler.
///
/// A client that cannot receive its identifier is never registered.
async fn handle_new_client(
    mut stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<ChannelRegistry>,
) {
    let id = Uuid::new_v4();

    if let Err(e) = send_identifier(&mut stream, &id).await {
        info!("Client {} at {} failed to connect: {}", id, addr, e);
        let _ = stream.shutdown().await;
        return;
    }

    let node = Arc::new(ClientNode::new(id, addr));
    if let Err(e) = registry.add(LOBBY_CHANNEL, Arc::clone(&node)).await {
        warn!("Failed to register client {}: {}", id, e);
        let _ = stream.shutdown().await;
        return;
    }

    handle_client(stream, node, registry).await;
}

/// Writes the raw 16-byte identifier, unframed.
async fn send_identifier(stream: &mut TcpStream, id: &Uuid) -> io::Result<()> {
    stream.write_all(id.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn test_config() -> StartupConfig {
        let mut config = ServerConfig::default().startup;
        config.bind_address = "127.0.0.1".into();
        config.control_port = 0;
        config.data_port = 0;
        config.channel_count = 16;
        config
    }

    #[tokio::test]
    async fn test_bind_allocates_registry() {
        let server = Server::bind(test_config()).await.unwrap();
        assert_eq!(server.registry().channel_count(), 16);
        assert_ne!(server.control_addr().unwrap().port(), 0);
        assert_ne!(server.data_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = test_config();
        config.control_port = taken.local_addr().unwrap().port();

        match Server::bind(config).await {
            Err(CastServerError::Bind { addr, .. }) => {
                assert!(addr.ends_with(&taken.local_addr().unwrap().port().to_string()))
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("bind should fail on a port in use"),
        }
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_client_reset_before_identifier_is_not_registered() {
        let registry = Arc::new(ChannelRegistry::new(4));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, addr) = listener.accept().await.unwrap();

        // Close with a reset so the identifier write fails
        client.set_linger(Some(Duration::ZERO)).unwrap();
        drop(client);
        sleep(Duration::from_millis(50)).await;

        timeout(
            Duration::from_secs(2),
            handle_new_client(stream, addr, Arc::clone(&registry)),
        )
        .await
        .unwrap();

        assert_eq!(registry.len(LOBBY_CHANNEL).await.unwrap(), 0);
    }
}
