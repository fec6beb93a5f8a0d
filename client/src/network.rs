//! Client transport: one connected UDP socket and its pump tasks

use log::{error, warn};
use shared::protocol::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Grace period after the goodbye datagram before the socket is dropped, so
/// it is not lost in the send buffer.
const BYE_GRACE: Duration = Duration::from_secs(1);

/// A decoded datagram from the server, stamped on arrival.
#[derive(Debug, Clone)]
pub struct InboundPacket {
    pub recv_time: Instant,
    pub packet: Packet,
}

/// Owns the client's UDP socket, connected to one server.
pub struct Connection {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
}

impl Connection {
    pub async fn connect(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        let server_addr: SocketAddr = server_addr.parse()?;
        socket.connect(server_addr).await?;

        Ok(Connection {
            socket,
            server_addr,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Spawns the task that decodes server datagrams into the inbound queue.
    pub fn spawn_receiver(&self, inbound_tx: mpsc::UnboundedSender<InboundPacket>) {
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv(&mut buffer).await {
                    Ok(len) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            let inbound = InboundPacket {
                                recv_time: Instant::now(),
                                packet,
                            };
                            if inbound_tx.send(inbound).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping malformed datagram: {}", e),
                    },
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outbound queue onto the socket.
    pub fn spawn_sender(&self, mut outbound_rx: mpsc::UnboundedReceiver<Packet>) {
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(packet) = outbound_rx.recv().await {
                if let Err(e) = socket.send(&packet.encode()).await {
                    error!("Failed to send to server: {}", e);
                }
            }
        });
    }

    /// Sends the goodbye datagram, if any, and gives it a moment to leave
    /// before the caller drops the socket.
    pub async fn shutdown(&self, goodbye: Option<Packet>) {
        if let Some(packet) = goodbye {
            if let Err(e) = self.socket.send(&packet.encode()).await {
                error!("Failed to send goodbye: {}", e);
            }
            tokio::time::sleep(BYE_GRACE).await;
        }
    }
}
