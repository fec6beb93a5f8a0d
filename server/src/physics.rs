//! Ball physics and collision resolution for one arena tick

use rand::Rng;
use shared::ball::{Ball, BALL_BOTTOMMOST_Y, BALL_LEFTMOST_X, BALL_RIGHTMOST_X, BALL_TOPMOST_Y};
use shared::paddle::{ContactZone, Paddle, Side};
use std::time::Instant;

// Rally speed-up factor range, applied per axis on every paddle hit
pub const RALLY_SPEEDUP_MIN: f32 = 1.0;
pub const RALLY_SPEEDUP_MAX: f32 = 1.25;

/// What happened to the ball during one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallEvent {
    WallBounce,
    Goal { scorer: Side },
    PaddleHit { side: Side, zone: ContactZone },
}

impl BallEvent {
    /// Sound cue relayed to both peers for this event.
    pub fn cue(&self) -> &'static str {
        match self {
            BallEvent::WallBounce | BallEvent::PaddleHit { .. } => "ball-hit",
            BallEvent::Goal { .. } => "score",
        }
    }
}

/// Advances the ball by `dt` seconds and resolves wall, goal and paddle
/// contacts. Scores are applied directly to the paddles; the returned events
/// let the caller relay sound cues.
pub fn step<R: Rng>(
    ball: &mut Ball,
    left: &mut Paddle,
    right: &mut Paddle,
    rng: &mut R,
    dt: f32,
    now: Instant,
) -> Vec<BallEvent> {
    let mut events = Vec::new();

    ball.advance(dt);

    if let Some(event) = resolve_walls(ball) {
        events.push(event);
    }
    if let Some(event) = resolve_goals(ball, left, right, rng) {
        events.push(event);
    }
    if let Some(event) = resolve_paddle(ball, left, rng, now) {
        events.push(event);
    }
    if let Some(event) = resolve_paddle(ball, right, rng, now) {
        events.push(event);
    }

    events
}

fn resolve_walls(ball: &mut Ball) -> Option<BallEvent> {
    if ball.y < BALL_TOPMOST_Y || ball.y > BALL_BOTTOMMOST_Y {
        ball.vy = -ball.vy;
        return Some(BallEvent::WallBounce);
    }
    None
}

fn resolve_goals<R: Rng>(
    ball: &mut Ball,
    left: &mut Paddle,
    right: &mut Paddle,
    rng: &mut R,
) -> Option<BallEvent> {
    let scorer = if ball.x <= BALL_LEFTMOST_X {
        right.score += 1;
        Side::Right
    } else if ball.x >= BALL_RIGHTMOST_X {
        left.score += 1;
        Side::Left
    } else {
        return None;
    };

    ball.reset(rng);
    Some(BallEvent::Goal { scorer })
}

fn resolve_paddle<R: Rng>(
    ball: &mut Ball,
    paddle: &mut Paddle,
    rng: &mut R,
    now: Instant,
) -> Option<BallEvent> {
    let zone = paddle.collides(&ball.rect(), now)?;

    ball.vx *= rng.gen_range(RALLY_SPEEDUP_MIN..=RALLY_SPEEDUP_MAX);
    ball.vy *= rng.gen_range(RALLY_SPEEDUP_MIN..=RALLY_SPEEDUP_MAX);
    ball.vx = -ball.vx;
    // Edge contacts deflect vertically as well
    if matches!(zone, ContactZone::Top | ContactZone::Bottom) {
        ball.vy = -ball.vy;
    }

    Some(BallEvent::PaddleHit {
        side: paddle.side,
        zone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::ball::{BALL_INITIAL_SPEED_X, BALL_INITIAL_SPEED_Y};
    use std::time::Duration;

    fn fixtures() -> (Ball, Paddle, Paddle, StdRng) {
        (
            Ball::new(),
            Paddle::new(Side::Left),
            Paddle::new(Side::Right),
            StdRng::seed_from_u64(1),
        )
    }

    #[test]
    fn test_wall_bounce_inverts_vertical_velocity() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        ball.y = 1.0;
        ball.vy = -60.0;
        let now = Instant::now();

        let events = step(&mut ball, &mut left, &mut right, &mut rng, 0.1, now);
        assert_eq!(events, vec![BallEvent::WallBounce]);
        assert_eq!(ball.vy, 60.0);
        assert_eq!(events[0].cue(), "ball-hit");
    }

    #[test]
    fn test_bottom_wall_bounces_too() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        ball.y = BALL_BOTTOMMOST_Y - 1.0;
        ball.vy = 60.0;

        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.1,
            Instant::now(),
        );
        assert_eq!(events, vec![BallEvent::WallBounce]);
        assert_eq!(ball.vy, -60.0);
    }

    #[test]
    fn test_left_goal_scores_for_the_right_player() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        ball.x = 2.0;
        ball.y = 116.0;
        ball.vx = -60.0;
        ball.vy = 0.0;

        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.1,
            Instant::now(),
        );
        assert_eq!(
            events,
            vec![BallEvent::Goal {
                scorer: Side::Right
            }]
        );
        assert_eq!(right.score, 1);
        assert_eq!(left.score, 0);
        assert_eq!(ball.x, 156.0);
        assert_eq!(ball.y, 116.0);
        assert_eq!(ball.vx.abs(), BALL_INITIAL_SPEED_X);
        assert_eq!(ball.vy.abs(), BALL_INITIAL_SPEED_Y);
        assert_eq!(events[0].cue(), "score");
    }

    #[test]
    fn test_right_goal_scores_for_the_left_player() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        ball.x = BALL_RIGHTMOST_X - 2.0;
        ball.y = 116.0;
        ball.vx = 60.0;
        ball.vy = 0.0;

        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.1,
            Instant::now(),
        );
        assert_eq!(events, vec![BallEvent::Goal { scorer: Side::Left }]);
        assert_eq!(left.score, 1);
        assert_eq!(right.score, 0);
    }

    #[test]
    fn test_front_face_hit_reverses_and_speeds_up_the_ball() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        // Drifting left into the left paddle's front face
        ball.x = left.x() + 9.0;
        ball.y = left.y + 16.0;
        ball.vx = -60.0;
        ball.vy = 30.0;

        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.05,
            Instant::now(),
        );
        assert_eq!(events.len(), 1);
        match events[0] {
            BallEvent::PaddleHit { side, zone } => {
                assert_eq!(side, Side::Left);
                assert_eq!(zone, ContactZone::Front);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        // Horizontal velocity flipped and both axes scaled by at most 25%
        assert!(ball.vx > 0.0);
        assert!(ball.vx >= 60.0 && ball.vx <= 75.0);
        assert!(ball.vy > 0.0);
        assert!(ball.vy >= 30.0 && ball.vy <= 37.5);
    }

    #[test]
    fn test_top_edge_hit_also_inverts_vertical_velocity() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        ball.x = left.x() + 5.0;
        ball.y = left.y - 5.0;
        ball.vx = -60.0;
        ball.vy = 30.0;

        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.01,
            Instant::now(),
        );
        assert_eq!(events.len(), 1);
        match events[0] {
            BallEvent::PaddleHit { zone, .. } => assert_eq!(zone, ContactZone::Top),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(ball.vx > 0.0);
        assert!(ball.vy < 0.0);
    }

    #[test]
    fn test_paddle_hits_are_debounced_then_allowed_again() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        let t0 = Instant::now();

        ball.x = left.x() + 9.0;
        ball.y = left.y + 16.0;
        ball.vx = -600.0;
        ball.vy = 0.0;

        let events = step(&mut ball, &mut left, &mut right, &mut rng, 0.01, t0);
        assert_eq!(events.len(), 1);
        let vx_after_first = ball.vx;

        // Push it straight back into the paddle inside the debounce window
        ball.x = left.x() + 4.0;
        ball.vx = -vx_after_first.abs();
        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.0,
            t0 + Duration::from_millis(100),
        );
        assert!(events.is_empty());
        assert!(ball.vx < 0.0);

        // After the window elapses the next overlap counts
        ball.x = left.x() + 4.0;
        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.0,
            t0 + Duration::from_millis(301),
        );
        assert_eq!(events.len(), 1);
        assert!(ball.vx > 0.0);
    }

    #[test]
    fn test_both_paddles_are_checked_every_tick() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        // Park the ball on the right paddle; the left paddle is far away
        ball.x = right.x() - 7.0;
        ball.y = right.y + 16.0;
        ball.vx = 60.0;
        ball.vy = 0.0;

        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.01,
            Instant::now(),
        );
        assert_eq!(events.len(), 1);
        match events[0] {
            BallEvent::PaddleHit { side, .. } => assert_eq!(side, Side::Right),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(ball.vx < 0.0);
    }

    #[test]
    fn test_quiet_tick_produces_no_events() {
        let (mut ball, mut left, mut right, mut rng) = fixtures();
        let events = step(
            &mut ball,
            &mut left,
            &mut right,
            &mut rng,
            0.001,
            Instant::now(),
        );
        assert!(events.is_empty());
    }
}
