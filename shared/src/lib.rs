pub mod ball;
pub mod geometry;
pub mod paddle;
pub mod protocol;

pub use ball::Ball;
pub use geometry::{
    Rect, BALL_SIZE, FIELD_HEIGHT, FIELD_WIDTH, GOAL_DEPTH, PADDLE_HEIGHT, PADDLE_SPEED,
    PADDLE_WIDTH,
};
pub use paddle::{ContactZone, Paddle, PaddleDirection, Side};
pub use protocol::{MalformedPacket, Packet, PacketKind};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Current wall-clock time in milliseconds, used as the packet sequence stamp
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
