use crate::geometry::{Rect, BALL_SIZE, FIELD_HEIGHT, FIELD_WIDTH};
use rand::Rng;

pub const BALL_INITIAL_SPEED_X: f32 = 60.0;
pub const BALL_INITIAL_SPEED_Y: f32 = 60.0;

// Extreme top-left positions the ball can occupy inside the field
pub const BALL_LEFTMOST_X: f32 = 0.0;
pub const BALL_RIGHTMOST_X: f32 = FIELD_WIDTH - BALL_SIZE;
pub const BALL_TOPMOST_Y: f32 = 0.0;
pub const BALL_BOTTOMMOST_Y: f32 = FIELD_HEIGHT - BALL_SIZE;

/// The ball, positioned by its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Ball {
    pub fn new() -> Self {
        Ball {
            x: FIELD_WIDTH / 2.0 - BALL_SIZE / 2.0,
            y: FIELD_HEIGHT / 2.0 - BALL_SIZE / 2.0,
            vx: BALL_INITIAL_SPEED_X,
            vy: BALL_INITIAL_SPEED_Y,
        }
    }

    /// Recenters the ball and restores the initial speed with each axis
    /// direction randomized independently.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        self.x = FIELD_WIDTH / 2.0 - BALL_SIZE / 2.0;
        self.y = FIELD_HEIGHT / 2.0 - BALL_SIZE / 2.0;
        self.vx = if rng.gen::<bool>() {
            BALL_INITIAL_SPEED_X
        } else {
            -BALL_INITIAL_SPEED_X
        };
        self.vy = if rng.gen::<bool>() {
            BALL_INITIAL_SPEED_Y
        } else {
            -BALL_INITIAL_SPEED_Y
        };
    }

    // Euler step over real elapsed seconds
    pub fn advance(&mut self, dt: f32) {
        self.x += self.vx * dt;
        self.y += self.vy * dt;
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, BALL_SIZE, BALL_SIZE)
    }
}

impl Default for Ball {
    fn default() -> Self {
        Ball::new()
    }
}
