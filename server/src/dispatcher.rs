//! Matchmaking dispatcher: routes datagrams to arenas and manages their
//! lifecycle. One dispatcher task owns all the routing tables; arenas run on
//! their own tasks and report back over the completion channel when they end.

use crate::arena::{Arena, ArenaConfig};
use crate::network::{NetworkMessage, OutboundSender};
use log::{debug, info, warn};
use shared::protocol::PacketKind;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub arena: ArenaConfig,
    /// How long shutdown waits for arenas to say goodbye before giving up.
    pub shutdown_drain: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            arena: ArenaConfig::default(),
            shutdown_drain: Duration::from_secs(2),
        }
    }
}

/// Dispatcher-side view of a running arena.
struct ArenaHandle {
    id: u32,
    inbound_tx: mpsc::UnboundedSender<NetworkMessage>,
    stop: Arc<AtomicBool>,
    seated: Vec<SocketAddr>,
}

impl ArenaHandle {
    fn has_room(&self) -> bool {
        self.seated.len() < 2
    }
}

/// Owns the addr-to-arena routing state. Every inbound datagram passes
/// through `route`; arena completions come back over the done channel.
pub struct Dispatcher {
    config: DispatcherConfig,
    inbound_rx: mpsc::UnboundedReceiver<NetworkMessage>,
    outbound_tx: OutboundSender,
    arenas: HashMap<u32, ArenaHandle>,
    addr_map: HashMap<SocketAddr, u32>,
    /// Arena still waiting for its second player, if any.
    open_arena: Option<u32>,
    done_tx: mpsc::UnboundedSender<u32>,
    done_rx: mpsc::UnboundedReceiver<u32>,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        inbound_rx: mpsc::UnboundedReceiver<NetworkMessage>,
        outbound_tx: OutboundSender,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Dispatcher {
            config,
            inbound_rx,
            outbound_tx,
            arenas: HashMap::new(),
            addr_map: HashMap::new(),
            open_arena: None,
            done_tx,
            done_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that makes `run` wind the server down. Safe to set from any task.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                message = self.inbound_rx.recv() => {
                    match message {
                        Some(message) => self.route(message),
                        None => break,
                    }
                }
                finished = self.done_rx.recv() => {
                    if let Some(id) = finished {
                        self.reap(id);
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }

            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
        }

        self.drain_shutdown().await;
    }

    /// Forwards a datagram to its arena, or seats an unmapped peer asking to
    /// join. Unmapped peers sending anything else are dropped.
    pub fn route(&mut self, message: NetworkMessage) {
        if let Some(&id) = self.addr_map.get(&message.addr) {
            if let Some(handle) = self.arenas.get(&id) {
                if handle.inbound_tx.send(message).is_err() {
                    // The arena ended but hasn't been reaped yet
                    debug!("Arena {} gone, dropping datagram", id);
                }
            }
            return;
        }

        if !matches!(message.packet.kind, PacketKind::RequestJoin) {
            debug!(
                "Dropping {:?} from unknown peer {}",
                message.packet.kind, message.addr
            );
            return;
        }

        let id = match self.open_arena_with_room() {
            Some(id) => id,
            None => self.spawn_arena(),
        };
        let handle = match self.arenas.get_mut(&id) {
            Some(handle) => handle,
            None => return,
        };

        handle.seated.push(message.addr);
        self.addr_map.insert(message.addr, id);
        info!(
            "Peer {} seated in arena {} ({}/2)",
            message.addr,
            id,
            handle.seated.len()
        );
        if !handle.has_room() {
            self.open_arena = None;
        }
        if let Some(handle) = self.arenas.get(&id) {
            if handle.inbound_tx.send(message).is_err() {
                warn!("Arena {} rejected a join datagram", id);
            }
        }
    }

    fn open_arena_with_room(&self) -> Option<u32> {
        let id = self.open_arena?;
        let handle = self.arenas.get(&id)?;
        handle.has_room().then_some(id)
    }

    fn spawn_arena(&mut self) -> u32 {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let arena = Arena::new(
            self.config.arena.clone(),
            inbound_rx,
            self.outbound_tx.clone(),
            Arc::clone(&stop),
            self.done_tx.clone(),
        );
        let id = arena.id();
        tokio::spawn(arena.run());

        info!("Spawned arena {}", id);
        self.arenas.insert(
            id,
            ArenaHandle {
                id,
                inbound_tx,
                stop,
                seated: Vec::new(),
            },
        );
        self.open_arena = Some(id);
        id
    }

    /// Drops a finished arena and unmaps its peers.
    fn reap(&mut self, id: u32) {
        let Some(handle) = self.arenas.remove(&id) else {
            return;
        };
        for addr in &handle.seated {
            self.addr_map.remove(addr);
        }
        if self.open_arena == Some(handle.id) {
            self.open_arena = None;
        }
        info!("Arena {} finished, {} still running", id, self.arenas.len());
    }

    /// Tells every arena to stop and waits for their goodbyes, bounded by the
    /// configured drain window.
    async fn drain_shutdown(&mut self) {
        info!("Shutting down, stopping {} arena(s)", self.arenas.len());
        for handle in self.arenas.values() {
            handle.stop.store(true, Ordering::Relaxed);
        }

        let deadline = tokio::time::Instant::now() + self.config.shutdown_drain;
        while !self.arenas.is_empty() {
            match tokio::time::timeout_at(deadline, self.done_rx.recv()).await {
                Ok(Some(id)) => self.reap(id),
                Ok(None) => break,
                Err(_) => {
                    warn!("{} arena(s) did not stop in time", self.arenas.len());
                    break;
                }
            }
        }
    }
}
