//! Server transport layer: the UDP socket and its receive/send pump tasks

use log::{error, info, warn};
use shared::protocol::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Envelope for a decoded datagram on its way to the dispatcher.
#[derive(Debug, Clone)]
pub struct NetworkMessage {
    pub addr: SocketAddr,
    pub recv_time: Instant,
    pub packet: Packet,
}

/// Queue end the rest of the server uses to transmit packets.
pub type OutboundSender = mpsc::UnboundedSender<(Packet, SocketAddr)>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<(Packet, SocketAddr)>;

/// Owns the server's UDP socket. Nothing else touches the socket; the rest
/// of the server talks to it through the inbound and outbound queues.
pub struct Transport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl Transport {
    pub async fn bind(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let local_addr = socket.local_addr()?;
        info!("Listening on {}", local_addr);

        Ok(Transport { socket, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns the task that listens for datagrams and decodes them into the
    /// inbound queue. Malformed datagrams are dropped with a warning.
    pub fn spawn_receiver(&self, inbound_tx: mpsc::UnboundedSender<NetworkMessage>) {
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            let message = NetworkMessage {
                                addr,
                                recv_time: Instant::now(),
                                packet,
                            };
                            if inbound_tx.send(message).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping malformed datagram from {}: {}", addr, e),
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
    pub fn spawn_sender(&self, mut outbound_rx: OutboundReceiver) {
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some((packet, addr)) = outbound_rx.recv().await {
                if let Err(e) = socket.send_to(&packet.encode(), addr).await {
                    error!("Failed to send to {}: {}", addr, e);
                }
            }
        });
    }
}
