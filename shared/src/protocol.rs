//! Wire protocol shared by the server and the client.
//!
//! Every packet is a single datagram: a 4-byte little-endian type tag, an
//! 8-byte little-endian send timestamp in milliseconds, then a type-specific
//! payload. The timestamp doubles as the sequence stamp receivers use to
//! discard stale position and state updates.

use std::fmt;
use std::str::Utf8Error;

pub const HEADER_LEN: usize = 12;

const TAG_REQUEST_JOIN: u32 = 1;
const TAG_ACCEPT_JOIN: u32 = 2;
const TAG_ACCEPT_JOIN_ACK: u32 = 3;
const TAG_HEARTBEAT: u32 = 4;
const TAG_HEARTBEAT_ACK: u32 = 5;
const TAG_GAME_START: u32 = 6;
const TAG_GAME_START_ACK: u32 = 7;
const TAG_PADDLE_POSITION: u32 = 8;
const TAG_GAME_STATE: u32 = 9;
const TAG_PLAY_SOUND_EFFECT: u32 = 10;
const TAG_BYE: u32 = 11;

#[derive(Debug, Clone, PartialEq)]
pub enum PacketKind {
    RequestJoin,
    /// Side assignment, raw on the wire (1 = left, 2 = right). The codec
    /// does not range-check it; the receiving session does.
    AcceptJoin {
        side: u32,
    },
    AcceptJoinAck,
    Heartbeat,
    HeartbeatAck,
    GameStart,
    GameStartAck,
    PaddlePosition {
        y: f32,
    },
    GameState {
        left_y: f32,
        right_y: f32,
        ball_x: f32,
        ball_y: f32,
        left_score: i32,
        right_score: i32,
    },
    PlaySoundEffect {
        cue: String,
    },
    Bye,
}

impl PacketKind {
    pub fn tag(&self) -> u32 {
        match self {
            PacketKind::RequestJoin => TAG_REQUEST_JOIN,
            PacketKind::AcceptJoin { .. } => TAG_ACCEPT_JOIN,
            PacketKind::AcceptJoinAck => TAG_ACCEPT_JOIN_ACK,
            PacketKind::Heartbeat => TAG_HEARTBEAT,
            PacketKind::HeartbeatAck => TAG_HEARTBEAT_ACK,
            PacketKind::GameStart => TAG_GAME_START,
            PacketKind::GameStartAck => TAG_GAME_START_ACK,
            PacketKind::PaddlePosition { .. } => TAG_PADDLE_POSITION,
            PacketKind::GameState { .. } => TAG_GAME_STATE,
            PacketKind::PlaySoundEffect { .. } => TAG_PLAY_SOUND_EFFECT,
            PacketKind::Bye => TAG_BYE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: PacketKind,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedPacket {
    TruncatedHeader { len: usize },
    UnknownTag { tag: u32 },
    TruncatedPayload { tag: u32, expected: usize, got: usize },
    InvalidCue(Utf8Error),
}

impl fmt::Display for MalformedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPacket::TruncatedHeader { len } => {
                write!(f, "datagram of {} bytes is shorter than the header", len)
            }
            MalformedPacket::UnknownTag { tag } => write!(f, "unknown packet tag {}", tag),
            MalformedPacket::TruncatedPayload { tag, expected, got } => write!(
                f,
                "packet tag {} needs a {}-byte payload, got {}",
                tag, expected, got
            ),
            MalformedPacket::InvalidCue(e) => write!(f, "sound cue is not valid UTF-8: {}", e),
        }
    }
}

impl std::error::Error for MalformedPacket {}

impl Packet {
    /// Wraps a kind with the current time as its sequence stamp.
    pub fn new(kind: PacketKind) -> Self {
        Packet {
            kind,
            timestamp: crate::timestamp_ms(),
        }
    }

    pub fn with_timestamp(kind: PacketKind, timestamp: u64) -> Self {
        Packet { kind, timestamp }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 24);
        out.extend_from_slice(&self.kind.tag().to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());

        match &self.kind {
            PacketKind::AcceptJoin { side } => out.extend_from_slice(&side.to_le_bytes()),
            PacketKind::PaddlePosition { y } => out.extend_from_slice(&y.to_le_bytes()),
            PacketKind::GameState {
                left_y,
                right_y,
                ball_x,
                ball_y,
                left_score,
                right_score,
            } => {
                out.extend_from_slice(&left_y.to_le_bytes());
                out.extend_from_slice(&right_y.to_le_bytes());
                out.extend_from_slice(&ball_x.to_le_bytes());
                out.extend_from_slice(&ball_y.to_le_bytes());
                out.extend_from_slice(&left_score.to_le_bytes());
                out.extend_from_slice(&right_score.to_le_bytes());
            }
            PacketKind::PlaySoundEffect { cue } => out.extend_from_slice(cue.as_bytes()),
            _ => {}
        }

        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MalformedPacket> {
        if bytes.len() < HEADER_LEN {
            return Err(MalformedPacket::TruncatedHeader { len: bytes.len() });
        }

        let tag = le_u32(bytes, 0);
        let timestamp = le_u64(bytes, 4);
        let payload = &bytes[HEADER_LEN..];

        let kind = match tag {
            TAG_REQUEST_JOIN => PacketKind::RequestJoin,
            TAG_ACCEPT_JOIN => {
                require(tag, payload, 4)?;
                PacketKind::AcceptJoin {
                    side: le_u32(payload, 0),
                }
            }
            TAG_ACCEPT_JOIN_ACK => PacketKind::AcceptJoinAck,
            TAG_HEARTBEAT => PacketKind::Heartbeat,
            TAG_HEARTBEAT_ACK => PacketKind::HeartbeatAck,
            TAG_GAME_START => PacketKind::GameStart,
            TAG_GAME_START_ACK => PacketKind::GameStartAck,
            TAG_PADDLE_POSITION => {
                require(tag, payload, 4)?;
                PacketKind::PaddlePosition {
                    y: le_f32(payload, 0),
                }
            }
            TAG_GAME_STATE => {
                require(tag, payload, 24)?;
                PacketKind::GameState {
                    left_y: le_f32(payload, 0),
                    right_y: le_f32(payload, 4),
                    ball_x: le_f32(payload, 8),
                    ball_y: le_f32(payload, 12),
                    left_score: le_i32(payload, 16),
                    right_score: le_i32(payload, 20),
                }
            }
            TAG_PLAY_SOUND_EFFECT => {
                // Cue name runs to the end of the datagram, no terminator
                let cue = std::str::from_utf8(payload).map_err(MalformedPacket::InvalidCue)?;
                PacketKind::PlaySoundEffect {
                    cue: cue.to_string(),
                }
            }
            other => return Err(MalformedPacket::UnknownTag { tag: other }),
        };

        Ok(Packet { kind, timestamp })
    }
}

fn require(tag: u32, payload: &[u8], expected: usize) -> Result<(), MalformedPacket> {
    if payload.len() < expected {
        return Err(MalformedPacket::TruncatedPayload {
            tag,
            expected,
            got: payload.len(),
        });
    }
    Ok(())
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn le_i32(bytes: &[u8], at: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    i32::from_le_bytes(raw)
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

fn le_f32(bytes: &[u8], at: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    f32::from_le_bytes(raw)
}
