//! # Geometry Primitives
//!
//! Small, pure helpers shared by the geometry model, path builder and
//! hit-testing: axis-aligned rectangles, curve evaluation and distance
//! queries. Everything operates on `glam::Vec2` in whatever space the
//! caller is working in.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle stored as min/max corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: pos + size,
        }
    }

    /// Builds a rect from two arbitrary corners.
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn expand(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    /// Shrinks the rect toward its center by a factor in `[0, 1]`.
    /// A factor of 1.0 returns the rect unchanged, 0.0 collapses it to the center.
    pub fn scale_from_center(&self, factor: f32) -> Self {
        let center = self.center();
        let half = self.size() * 0.5 * factor;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Grows the rect to cover `p`.
    pub fn union_point(&self, p: Vec2) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }
}

/// Evaluates a cubic Bezier at parameter `t`.
pub fn cubic_point(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

/// Evaluates a quadratic Bezier at parameter `t`.
pub fn quad_point(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
}

/// Squared distance from `p` to the segment `a..b`.
pub fn dist_sq_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance_squared(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance_squared(a + ab * t)
}

/// Minimum squared distance from `p` to a polyline.
pub fn dist_sq_to_polyline(p: Vec2, points: &[Vec2]) -> f32 {
    match points {
        [] => f32::INFINITY,
        [single] => p.distance_squared(*single),
        _ => points
            .windows(2)
            .map(|w| dist_sq_to_segment(p, w[0], w[1]))
            .fold(f32::INFINITY, f32::min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_and_intersects() {
        let r = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
        assert!(r.contains(Vec2::new(10.0, 10.0)));
        assert!(r.contains(Vec2::new(110.0, 60.0)));
        assert!(!r.contains(Vec2::new(9.9, 10.0)));

        let other = Rect::new(Vec2::new(100.0, 50.0), Vec2::new(50.0, 50.0));
        assert!(r.intersects(&other));
        let far = Rect::new(Vec2::new(500.0, 500.0), Vec2::new(10.0, 10.0));
        assert!(!r.intersects(&far));
    }

    #[test]
    fn scale_from_center_keeps_center() {
        let r = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 40.0));
        let shrunk = r.scale_from_center(0.4);
        assert_eq!(shrunk.center(), r.center());
        assert!((shrunk.width() - 40.0).abs() < 1e-5);
        assert!((shrunk.height() - 16.0).abs() < 1e-5);
    }

    #[test]
    fn cubic_endpoints() {
        let p0 = Vec2::new(0.0, 0.0);
        let p3 = Vec2::new(10.0, 5.0);
        let cp = Vec2::new(5.0, 20.0);
        assert_eq!(cubic_point(p0, cp, cp, p3, 0.0), p0);
        let end = cubic_point(p0, cp, cp, p3, 1.0);
        assert!((end - p3).length() < 1e-5);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(dist_sq_to_segment(Vec2::new(-5.0, 0.0), a, b), 25.0);
        assert_eq!(dist_sq_to_segment(Vec2::new(5.0, 3.0), a, b), 9.0);
    }
}
