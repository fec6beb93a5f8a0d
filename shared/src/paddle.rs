use crate::geometry::{
    Rect, FIELD_HEIGHT, FIELD_WIDTH, GOAL_DEPTH, PADDLE_HEIGHT, PADDLE_SPEED, PADDLE_WIDTH,
};
use std::time::{Duration, Instant};

pub const PADDLE_MIN_Y: f32 = 0.0;
pub const PADDLE_MAX_Y: f32 = FIELD_HEIGHT - PADDLE_HEIGHT;

/// Height of the top and bottom collision strips; the front face covers the
/// rest of the paddle.
pub const PADDLE_EDGE_HEIGHT: f32 = 4.0;

/// Minimum gap between two collisions on the same paddle.
pub const HIT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn to_wire(self) -> u32 {
        match self {
            Side::Left => 1,
            Side::Right => 2,
        }
    }

    pub fn from_wire(raw: u32) -> Option<Side> {
        match raw {
            1 => Some(Side::Left),
            2 => Some(Side::Right),
            _ => None,
        }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Direction the local player is steering the paddle this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddleDirection {
    Up,
    Down,
    Still,
}

/// Which part of the paddle the ball touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactZone {
    Top,
    Front,
    Bottom,
}

#[derive(Debug, Clone)]
pub struct Paddle {
    pub side: Side,
    pub y: f32,
    pub score: i32,
    last_hit: Option<Instant>,
}

impl Paddle {
    pub fn new(side: Side) -> Self {
        Paddle {
            side,
            y: (FIELD_HEIGHT - PADDLE_HEIGHT) / 2.0,
            score: 0,
            last_hit: None,
        }
    }

    pub fn x(&self) -> f32 {
        match self.side {
            Side::Left => GOAL_DEPTH,
            Side::Right => FIELD_WIDTH - GOAL_DEPTH - PADDLE_WIDTH,
        }
    }

    pub fn reset(&mut self) {
        self.y = (FIELD_HEIGHT - PADDLE_HEIGHT) / 2.0;
        self.score = 0;
        self.last_hit = None;
    }

    /// Moves the paddle one frame's worth in the given direction, clamped to
    /// the field.
    pub fn steer(&mut self, direction: PaddleDirection, dt: f32) {
        match direction {
            PaddleDirection::Up => self.y -= PADDLE_SPEED * dt,
            PaddleDirection::Down => self.y += PADDLE_SPEED * dt,
            PaddleDirection::Still => {}
        }
        self.y = self.y.clamp(PADDLE_MIN_Y, PADDLE_MAX_Y);
    }

    pub fn set_y(&mut self, y: f32) {
        self.y = y.clamp(PADDLE_MIN_Y, PADDLE_MAX_Y);
    }

    pub fn top_zone(&self) -> Rect {
        Rect::new(self.x(), self.y, PADDLE_WIDTH, PADDLE_EDGE_HEIGHT)
    }

    pub fn front_zone(&self) -> Rect {
        Rect::new(
            self.x(),
            self.y + PADDLE_EDGE_HEIGHT,
            PADDLE_WIDTH,
            PADDLE_HEIGHT - 2.0 * PADDLE_EDGE_HEIGHT,
        )
    }

    pub fn bottom_zone(&self) -> Rect {
        Rect::new(
            self.x(),
            self.y + PADDLE_HEIGHT - PADDLE_EDGE_HEIGHT,
            PADDLE_WIDTH,
            PADDLE_EDGE_HEIGHT,
        )
    }

    /// Checks the ball against the three collision zones. Hits within
    /// `HIT_DEBOUNCE` of the previous one on this paddle are ignored.
    pub fn collides(&mut self, ball: &Rect, now: Instant) -> Option<ContactZone> {
        if let Some(prev) = self.last_hit {
            if now.duration_since(prev) < HIT_DEBOUNCE {
                return None;
            }
        }

        let zone = if self.top_zone().intersects(ball) {
            ContactZone::Top
        } else if self.bottom_zone().intersects(ball) {
            ContactZone::Bottom
        } else if self.front_zone().intersects(ball) {
            ContactZone::Front
        } else {
            return None;
        };

        self.last_hit = Some(now);
        Some(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BALL_SIZE;
    use assert_approx_eq::assert_approx_eq;

    fn ball_at(x: f32, y: f32) -> Rect {
        Rect::new(x, y, BALL_SIZE, BALL_SIZE)
    }

    #[test]
    fn test_side_wire_mapping() {
        assert_eq!(Side::Left.to_wire(), 1);
        assert_eq!(Side::Right.to_wire(), 2);
        assert_eq!(Side::from_wire(1), Some(Side::Left));
        assert_eq!(Side::from_wire(2), Some(Side::Right));
        assert_eq!(Side::from_wire(0), None);
        assert_eq!(Side::from_wire(3), None);
        assert_eq!(Side::Left.opponent(), Side::Right);
    }

    #[test]
    fn test_paddle_x_per_side() {
        assert_eq!(Paddle::new(Side::Left).x(), 12.0);
        assert_eq!(Paddle::new(Side::Right).x(), 300.0);
    }

    #[test]
    fn test_new_paddle_is_centered() {
        let paddle = Paddle::new(Side::Left);
        assert_eq!(paddle.y, 98.0);
        assert_eq!(paddle.score, 0);
    }

    #[test]
    fn test_zones_are_disjoint_and_cover_the_paddle() {
        let paddle = Paddle::new(Side::Left);
        let top = paddle.top_zone();
        let front = paddle.front_zone();
        let bottom = paddle.bottom_zone();

        assert_eq!(top.h, 4.0);
        assert_eq!(front.h, 36.0);
        assert_eq!(bottom.h, 4.0);
        assert_eq!(top.bottom(), front.top());
        assert_eq!(front.bottom(), bottom.top());
        assert_eq!(bottom.bottom() - top.top(), PADDLE_HEIGHT);
        assert!(!top.intersects(&front));
        assert!(!front.intersects(&bottom));
    }

    #[test]
    fn test_steer_moves_and_clamps() {
        let mut paddle = Paddle::new(Side::Left);
        paddle.steer(PaddleDirection::Up, 0.1);
        assert_approx_eq!(paddle.y, 98.0 - 10.0, 0.001);

        paddle.steer(PaddleDirection::Still, 1.0);
        assert_approx_eq!(paddle.y, 88.0, 0.001);

        paddle.steer(PaddleDirection::Up, 10.0);
        assert_eq!(paddle.y, PADDLE_MIN_Y);

        paddle.steer(PaddleDirection::Down, 10.0);
        assert_eq!(paddle.y, PADDLE_MAX_Y);
    }

    #[test]
    fn test_set_y_clamps() {
        let mut paddle = Paddle::new(Side::Right);
        paddle.set_y(-50.0);
        assert_eq!(paddle.y, 0.0);
        paddle.set_y(1000.0);
        assert_eq!(paddle.y, 196.0);
        paddle.set_y(42.0);
        assert_eq!(paddle.y, 42.0);
    }

    #[test]
    fn test_collides_reports_zone() {
        let now = Instant::now();
        let mut paddle = Paddle::new(Side::Left);

        let front = ball_at(paddle.x() - 4.0, paddle.y + 16.0);
        assert_eq!(paddle.collides(&front, now), Some(ContactZone::Front));

        let mut paddle = Paddle::new(Side::Left);
        let top = ball_at(paddle.x() - 4.0, paddle.y - 6.0);
        assert_eq!(paddle.collides(&top, now), Some(ContactZone::Top));

        let mut paddle = Paddle::new(Side::Left);
        let bottom = ball_at(paddle.x() - 4.0, paddle.y + PADDLE_HEIGHT - 2.0);
        assert_eq!(paddle.collides(&bottom, now), Some(ContactZone::Bottom));

        let mut paddle = Paddle::new(Side::Left);
        let miss = ball_at(200.0, 200.0);
        assert_eq!(paddle.collides(&miss, now), None);
    }

    #[test]
    fn test_collision_debounce() {
        let t0 = Instant::now();
        let mut paddle = Paddle::new(Side::Left);
        let ball = ball_at(paddle.x() - 4.0, paddle.y + 16.0);

        assert!(paddle.collides(&ball, t0).is_some());
        assert!(paddle.collides(&ball, t0 + Duration::from_millis(100)).is_none());
        assert!(paddle.collides(&ball, t0 + Duration::from_millis(199)).is_none());
        assert!(paddle.collides(&ball, t0 + Duration::from_millis(300)).is_some());
    }

    #[test]
    fn test_debounce_window_restarts_after_a_hit() {
        let t0 = Instant::now();
        let mut paddle = Paddle::new(Side::Left);
        let ball = ball_at(paddle.x() - 4.0, paddle.y + 16.0);

        assert!(paddle.collides(&ball, t0).is_some());
        assert!(paddle.collides(&ball, t0 + Duration::from_millis(250)).is_some());
        assert!(paddle.collides(&ball, t0 + Duration::from_millis(350)).is_none());
    }

    #[test]
    fn test_reset_clears_score_and_debounce() {
        let t0 = Instant::now();
        let mut paddle = Paddle::new(Side::Left);
        let ball = ball_at(paddle.x() - 4.0, paddle.y + 16.0);

        paddle.score = 5;
        paddle.y = 10.0;
        assert!(paddle.collides(&ball, t0).is_some());

        paddle.reset();
        assert_eq!(paddle.score, 0);
        assert_eq!(paddle.y, 98.0);
        let ball = ball_at(paddle.x() - 4.0, paddle.y + 16.0);
        assert!(paddle.collides(&ball, t0 + Duration::from_millis(1)).is_some());
    }
}
