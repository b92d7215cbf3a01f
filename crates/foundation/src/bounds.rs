use crate::math::Vec2;

/// Axis-aligned screen rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Rectangle anchored at the origin, e.g. a viewport of `w` x `h` pixels.
    pub fn from_size(size: Vec2) -> Self {
        Aabb2::new([0.0, 0.0], [size.x, size.y])
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
        )
    }

    /// Edges are inclusive.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.y >= self.min[1] && p.x <= self.max[0] && p.y <= self.max[1]
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.min[0], self.max[0]),
            p.y.clamp(self.min[1], self.max[1]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;
    use crate::math::Vec2;

    #[test]
    fn contains_includes_edges() {
        let b = Aabb2::from_size(Vec2::new(800.0, 600.0));
        assert!(b.contains(Vec2::new(0.0, 0.0)));
        assert!(b.contains(Vec2::new(800.0, 600.0)));
        assert!(!b.contains(Vec2::new(800.5, 10.0)));
        assert!(!b.contains(Vec2::new(10.0, -0.1)));
    }

    #[test]
    fn clamp_snaps_to_nearest_edge() {
        let b = Aabb2::from_size(Vec2::new(800.0, 600.0));
        assert_eq!(b.clamp(Vec2::new(900.0, 300.0)), Vec2::new(800.0, 300.0));
        assert_eq!(b.clamp(Vec2::new(-4.0, 700.0)), Vec2::new(0.0, 600.0));
        assert_eq!(b.center(), Vec2::new(400.0, 300.0));
    }
}
