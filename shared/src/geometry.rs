pub const FIELD_WIDTH: f32 = 320.0;
pub const FIELD_HEIGHT: f32 = 240.0;
pub const BALL_SIZE: f32 = 8.0;
pub const PADDLE_WIDTH: f32 = 8.0;
pub const PADDLE_HEIGHT: f32 = 44.0;
pub const GOAL_DEPTH: f32 = 12.0;
pub const PADDLE_SPEED: f32 = 100.0;

/// Axis-aligned rectangle with its origin in the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    // Strict overlap; rectangles that only share an edge do not intersect
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10.0, 20.0, 8.0, 44.0);
        assert_eq!(rect.left(), 10.0);
        assert_eq!(rect.right(), 18.0);
        assert_eq!(rect.top(), 20.0);
        assert_eq!(rect.bottom(), 64.0);
    }

    #[test]
    fn test_intersects_overlap() {
        let a = Rect::new(0.0, 0.0, 8.0, 8.0);
        let b = Rect::new(4.0, 4.0, 8.0, 8.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_intersects_disjoint() {
        let a = Rect::new(0.0, 0.0, 8.0, 8.0);
        let b = Rect::new(100.0, 100.0, 8.0, 8.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_intersects_edge_touch_is_not_a_hit() {
        let a = Rect::new(0.0, 0.0, 8.0, 8.0);
        let b = Rect::new(8.0, 0.0, 8.0, 8.0);
        assert!(!a.intersects(&b));

        let c = Rect::new(0.0, 8.0, 8.0, 8.0);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_field_proportions() {
        assert!(FIELD_WIDTH > FIELD_HEIGHT);
        assert!(PADDLE_HEIGHT < FIELD_HEIGHT);
        assert!(GOAL_DEPTH > BALL_SIZE / 2.0);
    }
}
