//! Client session state machine: join handshake, heartbeating, paddle
//! reporting and application of authoritative snapshots.
//!
//! The session is synchronous; the caller feeds it at most one inbound packet
//! per frame along with the steering input and the elapsed time. A single
//! `last_sent` stamp throttles every outbound kind, so an ack or a paddle
//! report defers the next heartbeat.

use crate::network::InboundPacket;
use log::{debug, info, warn};
use shared::ball::Ball;
use shared::paddle::{Paddle, PaddleDirection, Side};
use shared::protocol::{Packet, PacketKind};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Silence from the server longer than this ends the session.
    pub heartbeat_timeout: Duration,
    pub join_retry: Duration,
    pub heartbeat_interval: Duration,
    pub paddle_send_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            heartbeat_timeout: Duration::from_secs(20),
            join_retry: Duration::from_secs(1),
            heartbeat_interval: Duration::from_millis(200),
            paddle_send_interval: Duration::from_secs_f32(1.0 / 30.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    EstablishingConnection,
    WaitingForGameStart,
    InGame,
    GameOver,
}

/// Protocol violations that end the session immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    InvalidSide { raw: u32 },
    SideChanged { fixed: Side, raw: u32 },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidSide { raw } => {
                write!(f, "server assigned invalid side {}", raw)
            }
            SessionError::SideChanged { fixed, raw } => {
                write!(f, "server reassigned side {:?} to raw {}", fixed, raw)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Everything a frontend needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSnapshot {
    pub state: SessionState,
    pub side: Option<Side>,
    pub left_y: f32,
    pub right_y: f32,
    pub left_score: i32,
    pub right_score: i32,
    pub ball_x: f32,
    pub ball_y: f32,
}

pub struct Session {
    config: SessionConfig,
    state: SessionState,
    outbound_tx: mpsc::UnboundedSender<Packet>,
    side: Option<Side>,
    left: Paddle,
    right: Paddle,
    ball_x: f32,
    ball_y: f32,
    last_sent: Option<Instant>,
    /// Freshest send stamp seen on a snapshot or heartbeat ack.
    last_recv_stamp: u64,
    last_ack: Option<Instant>,
    last_paddle_sent_y: Option<f32>,
    cues: Vec<String>,
}

impl Session {
    pub fn new(config: SessionConfig, outbound_tx: mpsc::UnboundedSender<Packet>) -> Self {
        let ball = Ball::new();
        Session {
            config,
            state: SessionState::EstablishingConnection,
            outbound_tx,
            side: None,
            left: Paddle::new(Side::Left),
            right: Paddle::new(Side::Right),
            ball_x: ball.x,
            ball_y: ball.y,
            last_sent: None,
            last_recv_stamp: 0,
            last_ack: None,
            last_paddle_sent_y: None,
            cues: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    /// Runs one frame: applies the inbound packet if any, checks server
    /// liveness, steers the local paddle and emits whatever the throttle
    /// allows.
    pub fn drive(
        &mut self,
        inbound: Option<InboundPacket>,
        direction: PaddleDirection,
        dt: f32,
        now: Instant,
    ) -> Result<(), SessionError> {
        if let Some(inbound) = inbound {
            self.handle_packet(inbound, now)?;
        }

        if self.state != SessionState::GameOver {
            if let Some(last_ack) = self.last_ack {
                if now.duration_since(last_ack) > self.config.heartbeat_timeout {
                    warn!("Server went silent, ending session");
                    self.state = SessionState::GameOver;
                }
            }
        }

        match self.state {
            SessionState::EstablishingConnection => {
                if self.send_due(self.config.join_retry, now) {
                    self.send(PacketKind::RequestJoin, now);
                }
            }
            SessionState::WaitingForGameStart => {
                if self.send_due(self.config.heartbeat_interval, now) {
                    self.send(PacketKind::Heartbeat, now);
                }
            }
            SessionState::InGame => self.in_game_frame(direction, dt, now),
            SessionState::GameOver => {}
        }

        Ok(())
    }

    fn in_game_frame(&mut self, direction: PaddleDirection, dt: f32, now: Instant) {
        let Some(side) = self.side else {
            return;
        };
        let paddle = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        paddle.steer(direction, dt);
        let y = paddle.y;

        if self.send_due(self.config.paddle_send_interval, now)
            && self.last_paddle_sent_y != Some(y)
        {
            self.send(PacketKind::PaddlePosition { y }, now);
            self.last_paddle_sent_y = Some(y);
        } else if self.send_due(self.config.heartbeat_interval, now) {
            self.send(PacketKind::Heartbeat, now);
        }
    }

    fn handle_packet(&mut self, inbound: InboundPacket, now: Instant) -> Result<(), SessionError> {
        let stamp = inbound.packet.timestamp;

        match inbound.packet.kind {
            PacketKind::AcceptJoin { side: raw } => {
                let side = Side::from_wire(raw).ok_or(SessionError::InvalidSide { raw })?;
                match self.side {
                    None => {
                        info!("Joined as the {:?} player", side);
                        self.side = Some(side);
                        self.state = SessionState::WaitingForGameStart;
                    }
                    Some(fixed) if fixed != side => {
                        return Err(SessionError::SideChanged { fixed, raw });
                    }
                    // Duplicate accept, the ack below is enough
                    Some(_) => {}
                }
                self.send(PacketKind::AcceptJoinAck, now);
            }
            PacketKind::GameStart => {
                self.send(PacketKind::GameStartAck, now);
                if self.state == SessionState::WaitingForGameStart {
                    info!("Match starting");
                    self.state = SessionState::InGame;
                    self.last_paddle_sent_y = None;
                }
            }
            PacketKind::HeartbeatAck => {
                self.last_ack = Some(inbound.recv_time);
                if stamp > self.last_recv_stamp {
                    self.last_recv_stamp = stamp;
                }
            }
            PacketKind::GameState {
                left_y,
                right_y,
                ball_x,
                ball_y,
                left_score,
                right_score,
            } => {
                self.last_ack = Some(inbound.recv_time);
                if stamp > self.last_recv_stamp {
                    self.last_recv_stamp = stamp;
                    self.left.score = left_score;
                    self.right.score = right_score;
                    self.ball_x = ball_x;
                    self.ball_y = ball_y;
                    // The local paddle stays under local control
                    match self.side {
                        Some(Side::Left) => self.right.set_y(right_y),
                        Some(Side::Right) => self.left.set_y(left_y),
                        None => {
                            self.left.set_y(left_y);
                            self.right.set_y(right_y);
                        }
                    }
                }
            }
            PacketKind::PlaySoundEffect { cue } => self.cues.push(cue),
            PacketKind::Bye => {
                info!("Server ended the session");
                self.state = SessionState::GameOver;
            }
            other => debug!("Ignoring unexpected {:?}", other),
        }

        Ok(())
    }

    /// Ends the session and returns the goodbye packet for the transport.
    pub fn quit(&mut self) -> Packet {
        self.state = SessionState::GameOver;
        Packet::new(PacketKind::Bye)
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            state: self.state,
            side: self.side,
            left_y: self.left.y,
            right_y: self.right.y,
            left_score: self.left.score,
            right_score: self.right.score,
            ball_x: self.ball_x,
            ball_y: self.ball_y,
        }
    }

    /// Drains the sound cues collected since the last call.
    pub fn take_sound_cues(&mut self) -> Vec<String> {
        std::mem::take(&mut self.cues)
    }

    fn send_due(&self, interval: Duration, now: Instant) -> bool {
        self.last_sent
            .map_or(true, |last| now.duration_since(last) >= interval)
    }

    fn send(&mut self, kind: PacketKind, now: Instant) {
        if self.outbound_tx.send(Packet::new(kind)).is_err() {
            debug!("Transport gone, dropping outbound packet");
        }
        self.last_sent = Some(now);
    }
}
