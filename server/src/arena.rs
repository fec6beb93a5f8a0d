//! One match: two player slots, the authoritative ball, and the
//! connection/start/play/teardown state machine.
//!
//! Each arena runs on its own task and owns its slots outright; the only
//! way in is the inbound queue the dispatcher routes into, and the only way
//! out is the shared outbound queue to the transport. One inbound message is
//! consumed per tick, physics advances by real elapsed time, and every
//! outbound send to a peer refreshes that peer's single last-sent time, so a
//! heartbeat ack defers the next snapshot resend to the same peer.

use crate::network::{NetworkMessage, OutboundSender};
use crate::physics::{self, BallEvent};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::ball::Ball;
use shared::paddle::{Paddle, Side};
use shared::protocol::{Packet, PacketKind};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

/// Protocol timing knobs. Defaults match live play; tests shrink them.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Slot is dead after this much silence, counted once it has spoken
    pub heartbeat_timeout: Duration,
    /// Game-start retry cadence per not-ready slot
    pub game_start_retry: Duration,
    /// Snapshot resend cadence per peer
    pub snapshot_interval: Duration,
    /// Idle yield between tick iterations
    pub tick_sleep: Duration,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            heartbeat_timeout: Duration::from_secs(20),
            game_start_retry: Duration::from_millis(2500),
            snapshot_interval: Duration::from_secs_f64(1.0 / 30.0),
            tick_sleep: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaState {
    WaitingForPlayers,
    NotifyingGameStart,
    InGame,
    GameOver,
}

/// One seat. Only the arena's own tick ever mutates it.
#[derive(Debug)]
pub struct PlayerSlot {
    pub addr: Option<SocketAddr>,
    pub paddle: Paddle,
    pub has_paddle: bool,
    pub ready: bool,
    pub last_recv: Option<Instant>,
    pub last_sent: Option<Instant>,
    pub last_stamp: u64,
}

impl PlayerSlot {
    fn new(side: Side) -> Self {
        PlayerSlot {
            addr: None,
            paddle: Paddle::new(side),
            has_paddle: false,
            ready: false,
            last_recv: None,
            last_sent: None,
            last_stamp: 0,
        }
    }

    // Timeout is armed only once the peer has sent something
    fn timed_out(&self, now: Instant, timeout: Duration) -> bool {
        match self.last_recv {
            Some(last) => now.duration_since(last) > timeout,
            None => false,
        }
    }

    fn send(&mut self, kind: PacketKind, outbound: &OutboundSender, now: Instant) {
        if let Some(addr) = self.addr {
            if outbound.send((Packet::new(kind), addr)).is_err() {
                debug!("Outbound queue closed");
            }
            self.last_sent = Some(now);
        }
    }

    /// Sends only if `interval` has elapsed since the last send of any kind
    /// to this peer.
    fn send_throttled(
        &mut self,
        kind: PacketKind,
        interval: Duration,
        outbound: &OutboundSender,
        now: Instant,
    ) {
        let due = match self.last_sent {
            Some(last) => now.duration_since(last) >= interval,
            None => true,
        };
        if due {
            self.send(kind, outbound, now);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndReason {
    Goodbye { from: SocketAddr },
    Timeout,
    Stopped,
}

pub struct Arena {
    id: u32,
    state: ArenaState,
    config: ArenaConfig,
    left: PlayerSlot,
    right: PlayerSlot,
    ball: Ball,
    rng: StdRng,
    match_clock: Duration,
    inbound_rx: mpsc::UnboundedReceiver<NetworkMessage>,
    outbound_tx: OutboundSender,
    stop: Arc<AtomicBool>,
    done_tx: mpsc::UnboundedSender<u32>,
    last_tick: Instant,
}

impl Arena {
    pub fn new(
        config: ArenaConfig,
        inbound_rx: mpsc::UnboundedReceiver<NetworkMessage>,
        outbound_tx: OutboundSender,
        stop: Arc<AtomicBool>,
        done_tx: mpsc::UnboundedSender<u32>,
    ) -> Self {
        Arena {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            state: ArenaState::WaitingForPlayers,
            config,
            left: PlayerSlot::new(Side::Left),
            right: PlayerSlot::new(Side::Right),
            ball: Ball::new(),
            rng: StdRng::from_entropy(),
            match_clock: Duration::ZERO,
            inbound_rx,
            outbound_tx,
            stop,
            done_tx,
            last_tick: Instant::now(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> ArenaState {
        self.state
    }

    /// Runs the match to completion, then notifies the dispatcher.
    pub async fn run(mut self) {
        info!("[{:03}] Arena opened", self.id);
        self.last_tick = Instant::now();

        loop {
            tokio::time::sleep(self.config.tick_sleep).await;
            if !self.tick(Instant::now()) {
                break;
            }
        }

        info!(
            "[{:03}] Arena closed after {:.1?} of play, final score {} - {}",
            self.id, self.match_clock, self.left.paddle.score, self.right.paddle.score
        );
        if self.done_tx.send(self.id).is_err() {
            debug!("[{:03}] Dispatcher gone before completion notice", self.id);
        }
    }

    /// One loop iteration: at most one inbound message, then the state's own
    /// work. Returns false once the arena has reached its terminal state.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.state == ArenaState::GameOver {
            return false;
        }

        let dt = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        let message = self.inbound_rx.try_recv().ok();

        if let Some(reason) = self.end_reason(message.as_ref(), now) {
            self.finish(reason, now);
            return false;
        }

        match self.state {
            ArenaState::WaitingForPlayers => self.waiting_tick(message, now),
            ArenaState::NotifyingGameStart => self.notifying_tick(message, now),
            ArenaState::InGame => self.in_game_tick(message, now, dt),
            ArenaState::GameOver => return false,
        }

        true
    }

    fn end_reason(&self, message: Option<&NetworkMessage>, now: Instant) -> Option<EndReason> {
        if self.stop.load(Ordering::Relaxed) {
            return Some(EndReason::Stopped);
        }

        if let Some(msg) = message {
            if matches!(msg.packet.kind, PacketKind::Bye) && self.slot_for(msg.addr).is_some() {
                return Some(EndReason::Goodbye { from: msg.addr });
            }
        }

        let timeout = self.config.heartbeat_timeout;
        if self.left.timed_out(now, timeout) || self.right.timed_out(now, timeout) {
            return Some(EndReason::Timeout);
        }

        None
    }

    // Exactly one goodbye reaches each peer that should hear one
    fn finish(&mut self, reason: EndReason, now: Instant) {
        let outbound = self.outbound_tx.clone();
        match reason {
            EndReason::Goodbye { from } => {
                info!("[{:03}] Peer {} said goodbye", self.id, from);
                if self.left.addr != Some(from) {
                    self.left.send(PacketKind::Bye, &outbound, now);
                }
                if self.right.addr != Some(from) {
                    self.right.send(PacketKind::Bye, &outbound, now);
                }
            }
            EndReason::Timeout => {
                let timeout = self.config.heartbeat_timeout;
                info!("[{:03}] Peer timed out", self.id);
                if !self.left.timed_out(now, timeout) {
                    self.left.send(PacketKind::Bye, &outbound, now);
                }
                if !self.right.timed_out(now, timeout) {
                    self.right.send(PacketKind::Bye, &outbound, now);
                }
            }
            EndReason::Stopped => {
                info!("[{:03}] Stop requested", self.id);
                self.left.send(PacketKind::Bye, &outbound, now);
                self.right.send(PacketKind::Bye, &outbound, now);
            }
        }
        self.state = ArenaState::GameOver;
    }

    fn waiting_tick(&mut self, message: Option<NetworkMessage>, now: Instant) {
        if let Some(msg) = message {
            self.handle_waiting_message(msg, now);
        }

        if self.left.has_paddle && self.right.has_paddle {
            info!("[{:03}] Both players joined", self.id);
            let outbound = self.outbound_tx.clone();
            self.left.send(PacketKind::GameStart, &outbound, now);
            self.right.send(PacketKind::GameStart, &outbound, now);
            self.state = ArenaState::NotifyingGameStart;
        }
    }

    fn handle_waiting_message(&mut self, msg: NetworkMessage, now: Instant) {
        let side = match self.slot_for(msg.addr) {
            Some(side) => side,
            None if matches!(msg.packet.kind, PacketKind::RequestJoin) => {
                match self.seat(msg.addr) {
                    Some(side) => side,
                    None => {
                        warn!("[{:03}] Join request from {} but full", self.id, msg.addr);
                        return;
                    }
                }
            }
            None => {
                debug!("[{:03}] Stray packet from {}", self.id, msg.addr);
                return;
            }
        };

        let outbound = self.outbound_tx.clone();
        let id = self.id;
        let slot = self.slot_mut(side);
        slot.last_recv = Some(msg.recv_time);

        match msg.packet.kind {
            PacketKind::RequestJoin => {
                slot.send(
                    PacketKind::AcceptJoin {
                        side: side.to_wire(),
                    },
                    &outbound,
                    now,
                );
            }
            PacketKind::AcceptJoinAck => {
                slot.has_paddle = true;
                debug!("[{:03}] {:?} slot acknowledged its paddle", id, side);
            }
            PacketKind::Heartbeat => {
                // A heartbeat this early means our accept never arrived
                slot.send(PacketKind::HeartbeatAck, &outbound, now);
                if !slot.has_paddle {
                    slot.send(
                        PacketKind::AcceptJoin {
                            side: side.to_wire(),
                        },
                        &outbound,
                        now,
                    );
                }
            }
            ref other => debug!(
                "[{:03}] Ignoring {:?} while waiting for players",
                id,
                other.tag()
            ),
        }
    }

    fn notifying_tick(&mut self, message: Option<NetworkMessage>, now: Instant) {
        if let Some(msg) = message {
            self.handle_notifying_message(msg, now);
        }

        if self.left.ready && self.right.ready {
            self.begin_match(now);
            return;
        }

        let outbound = self.outbound_tx.clone();
        let retry = self.config.game_start_retry;
        if !self.left.ready {
            self.left
                .send_throttled(PacketKind::GameStart, retry, &outbound, now);
        }
        if !self.right.ready {
            self.right
                .send_throttled(PacketKind::GameStart, retry, &outbound, now);
        }
    }

    fn handle_notifying_message(&mut self, msg: NetworkMessage, now: Instant) {
        let side = match self.slot_for(msg.addr) {
            Some(side) => side,
            None => {
                debug!("[{:03}] Stray packet from {}", self.id, msg.addr);
                return;
            }
        };

        let outbound = self.outbound_tx.clone();
        let id = self.id;
        let slot = self.slot_mut(side);
        slot.last_recv = Some(msg.recv_time);

        match msg.packet.kind {
            PacketKind::GameStartAck => {
                slot.ready = true;
                debug!("[{:03}] {:?} slot is ready", id, side);
            }
            PacketKind::Heartbeat => slot.send(PacketKind::HeartbeatAck, &outbound, now),
            ref other => debug!(
                "[{:03}] Ignoring {:?} while notifying game start",
                id,
                other.tag()
            ),
        }
    }

    fn begin_match(&mut self, now: Instant) {
        info!("[{:03}] Both players ready, game on", self.id);
        self.ball.reset(&mut self.rng);
        self.left.paddle.reset();
        self.right.paddle.reset();
        self.match_clock = Duration::ZERO;

        let snapshot = self.snapshot_kind();
        let outbound = self.outbound_tx.clone();
        self.left.send(snapshot.clone(), &outbound, now);
        self.right.send(snapshot, &outbound, now);
        self.state = ArenaState::InGame;
    }

    fn in_game_tick(&mut self, message: Option<NetworkMessage>, now: Instant, dt: f32) {
        self.match_clock += Duration::from_secs_f32(dt.max(0.0));

        if let Some(msg) = message {
            self.handle_in_game_message(msg, now);
        }

        let events = physics::step(
            &mut self.ball,
            &mut self.left.paddle,
            &mut self.right.paddle,
            &mut self.rng,
            dt,
            now,
        );

        let outbound = self.outbound_tx.clone();
        for event in &events {
            if let BallEvent::Goal { scorer } = event {
                info!(
                    "[{:03}] {:?} scored, {} - {}",
                    self.id, scorer, self.left.paddle.score, self.right.paddle.score
                );
            }
            let cue = PacketKind::PlaySoundEffect {
                cue: event.cue().to_string(),
            };
            self.left.send(cue.clone(), &outbound, now);
            self.right.send(cue, &outbound, now);
        }

        let interval = self.config.snapshot_interval;
        let snapshot = self.snapshot_kind();
        self.left
            .send_throttled(snapshot.clone(), interval, &outbound, now);
        self.right
            .send_throttled(snapshot, interval, &outbound, now);
    }

    fn handle_in_game_message(&mut self, msg: NetworkMessage, now: Instant) {
        let side = match self.slot_for(msg.addr) {
            Some(side) => side,
            None => {
                debug!("[{:03}] Stray packet from {}", self.id, msg.addr);
                return;
            }
        };

        let outbound = self.outbound_tx.clone();
        let id = self.id;
        let slot = self.slot_mut(side);
        slot.last_recv = Some(msg.recv_time);

        match msg.packet.kind {
            PacketKind::PaddlePosition { y } => {
                // Reordered updates lose; only a strictly newer stamp applies
                if msg.packet.timestamp > slot.last_stamp {
                    slot.last_stamp = msg.packet.timestamp;
                    slot.paddle.set_y(y);
                }
            }
            PacketKind::Heartbeat => slot.send(PacketKind::HeartbeatAck, &outbound, now),
            PacketKind::GameStartAck => {} // late ack, the liveness refresh is enough
            ref other => debug!("[{:03}] Ignoring {:?} mid-game", id, other.tag()),
        }
    }

    fn snapshot_kind(&self) -> PacketKind {
        PacketKind::GameState {
            left_y: self.left.paddle.y,
            right_y: self.right.paddle.y,
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            left_score: self.left.paddle.score,
            right_score: self.right.paddle.score,
        }
    }

    // First join takes the left seat, the second the right
    fn seat(&mut self, addr: SocketAddr) -> Option<Side> {
        if self.left.addr.is_none() {
            self.left.addr = Some(addr);
            info!("[{:03}] {} seated on the left", self.id, addr);
            Some(Side::Left)
        } else if self.right.addr.is_none() {
            self.right.addr = Some(addr);
            info!("[{:03}] {} seated on the right", self.id, addr);
            Some(Side::Right)
        } else {
            None
        }
    }

    fn slot_for(&self, addr: SocketAddr) -> Option<Side> {
        if self.left.addr == Some(addr) {
            Some(Side::Left)
        } else if self.right.addr == Some(addr) {
            Some(Side::Right)
        } else {
            None
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut PlayerSlot {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}
