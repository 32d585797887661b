//! # Path Builder
//!
//! Turns a list of points plus an edge kind into drawable path geometry,
//! and builds arrow-marker geometry for edge endpoints. The output is a
//! verb list the host can feed straight into its path API; hit-testing
//! flattens the same verbs, so what you click is exactly what you see.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math;
use crate::model::{EdgeKind, MarkerKind};

/// A single path verb. Coordinates are in whatever space the points passed
/// to the builder were in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PathVerb {
    MoveTo(Vec2),
    LineTo(Vec2),
    /// Quadratic Bezier: control, end.
    QuadTo(Vec2, Vec2),
    /// Cubic Bezier: control 1, control 2, end.
    CubicTo(Vec2, Vec2, Vec2),
    Close,
}

/// A drawable path: an ordered list of verbs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathGeometry {
    pub verbs: Vec<PathVerb>,
}

impl PathGeometry {
    pub fn new() -> Self {
        Self { verbs: Vec::new() }
    }

    pub fn move_to(&mut self, p: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::MoveTo(p));
        self
    }

    pub fn line_to(&mut self, p: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::LineTo(p));
        self
    }

    pub fn quad_to(&mut self, ctrl: Vec2, end: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::QuadTo(ctrl, end));
        self
    }

    pub fn cubic_to(&mut self, c1: Vec2, c2: Vec2, end: Vec2) -> &mut Self {
        self.verbs.push(PathVerb::CubicTo(c1, c2, end));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.verbs.push(PathVerb::Close);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// The current endpoint of the path, if any.
    pub fn current_point(&self) -> Option<Vec2> {
        self.verbs.iter().rev().find_map(|verb| match verb {
            PathVerb::MoveTo(p) | PathVerb::LineTo(p) => Some(*p),
            PathVerb::QuadTo(_, p) | PathVerb::CubicTo(_, _, p) => Some(*p),
            PathVerb::Close => None,
        })
    }

    /// Applies a point transform to every coordinate in the path. Affine
    /// transforms (the viewport's scale+translate) map curves exactly.
    pub fn map_points(&self, mut f: impl FnMut(Vec2) -> Vec2) -> PathGeometry {
        PathGeometry {
            verbs: self
                .verbs
                .iter()
                .map(|verb| match *verb {
                    PathVerb::MoveTo(p) => PathVerb::MoveTo(f(p)),
                    PathVerb::LineTo(p) => PathVerb::LineTo(f(p)),
                    PathVerb::QuadTo(c, p) => PathVerb::QuadTo(f(c), f(p)),
                    PathVerb::CubicTo(c1, c2, p) => PathVerb::CubicTo(f(c1), f(c2), f(p)),
                    PathVerb::Close => PathVerb::Close,
                })
                .collect(),
        }
    }

    /// Flattens the path into a polyline, sampling each curved verb at
    /// `curve_samples` parametric steps. Used by hit-testing.
    pub fn flatten(&self, curve_samples: usize) -> Vec<Vec2> {
        let samples = curve_samples.max(1);
        let mut points = Vec::new();
        let mut start = Vec2::ZERO;
        let mut current = Vec2::ZERO;
        for verb in &self.verbs {
            match *verb {
                PathVerb::MoveTo(p) => {
                    points.push(p);
                    start = p;
                    current = p;
                }
                PathVerb::LineTo(p) => {
                    points.push(p);
                    current = p;
                }
                PathVerb::QuadTo(ctrl, end) => {
                    for i in 1..=samples {
                        let t = i as f32 / samples as f32;
                        points.push(math::quad_point(current, ctrl, end, t));
                    }
                    current = end;
                }
                PathVerb::CubicTo(c1, c2, end) => {
                    for i in 1..=samples {
                        let t = i as f32 / samples as f32;
                        points.push(math::cubic_point(current, c1, c2, end, t));
                    }
                    current = end;
                }
                PathVerb::Close => {
                    points.push(start);
                    current = start;
                }
            }
        }
        points
    }

    /// Bounding box over the path's control polygon. Conservative (control
    /// points of curves are included even though the curve stays inside
    /// their hull), which is what culling and hit pre-reject want.
    pub fn control_bounds(&self) -> Option<math::Rect> {
        let mut bounds: Option<math::Rect> = None;
        let mut push = |p: Vec2| {
            bounds = Some(match bounds {
                Some(b) => b.union_point(p),
                None => math::Rect { min: p, max: p },
            });
        };
        for verb in &self.verbs {
            match *verb {
                PathVerb::MoveTo(p) | PathVerb::LineTo(p) => push(p),
                PathVerb::QuadTo(c, p) => {
                    push(c);
                    push(p);
                }
                PathVerb::CubicTo(c1, c2, p) => {
                    push(c1);
                    push(c2);
                    push(p);
                }
                PathVerb::Close => {}
            }
        }
        bounds
    }
}

/// Builds the path for an edge through `points` (endpoints plus any
/// waypoints) in the shape requested by `kind`.
///
/// Fewer than two points yields an empty path.
pub fn build_edge_path(points: &[Vec2], kind: EdgeKind, smooth_radius: f32) -> PathGeometry {
    let mut path = PathGeometry::new();
    if points.len() < 2 {
        return path;
    }
    path.move_to(points[0]);
    match kind {
        EdgeKind::Straight => {
            for &p in &points[1..] {
                path.line_to(p);
            }
        }
        EdgeKind::Step => {
            for pair in points.windows(2) {
                append_step(&mut path, pair[0], pair[1]);
            }
        }
        EdgeKind::SmoothStep => {
            for pair in points.windows(2) {
                append_smooth_step(&mut path, pair[0], pair[1], smooth_radius);
            }
        }
        EdgeKind::Bezier => {
            if points.len() == 2 {
                append_bezier(&mut path, points[0], points[1], true);
            } else {
                append_waypoint_bezier(&mut path, points);
            }
        }
    }
    path
}

/// Right-angle routing: horizontal to the midpoint x, vertical, horizontal.
fn append_step(path: &mut PathGeometry, a: Vec2, b: Vec2) {
    let mid_x = (a.x + b.x) * 0.5;
    path.line_to(Vec2::new(mid_x, a.y));
    path.line_to(Vec2::new(mid_x, b.y));
    path.line_to(b);
}

/// Step routing with circular-arc corners.
///
/// The corner radius is capped at half the available horizontal and
/// vertical span; if the usable radius collapses (< 1) or the pair is
/// nearly horizontal, the segment falls back to a sharp step.
fn append_smooth_step(path: &mut PathGeometry, a: Vec2, b: Vec2, requested_radius: f32) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let half_h = (dx.abs() * 0.5).max(0.0);
    let radius = requested_radius.min(half_h).min(dy.abs() * 0.5);
    if radius < 1.0 || dy.abs() < 1.0 {
        append_step(path, a, b);
        return;
    }

    let mid_x = (a.x + b.x) * 0.5;
    let sx = dx.signum();
    let sy = dy.signum();

    // First corner at (mid_x, a.y), second at (mid_x, b.y). Each corner is
    // a quarter-turn approximated with a quadratic through the corner point.
    path.line_to(Vec2::new(mid_x - sx * radius, a.y));
    path.quad_to(Vec2::new(mid_x, a.y), Vec2::new(mid_x, a.y + sy * radius));
    path.line_to(Vec2::new(mid_x, b.y - sy * radius));
    path.quad_to(Vec2::new(mid_x, b.y), Vec2::new(mid_x + sx * radius, b.y));
    path.line_to(b);
}

/// Single-segment cubic. `horizontal_bias` forces both control points to
/// extend purely horizontally from their endpoints; otherwise the lean
/// follows the target's side (right of source = forward, left = reversed).
fn append_bezier(path: &mut PathGeometry, a: Vec2, b: Vec2, horizontal_bias: bool) {
    let offset = bezier_offset(a, b);
    let dir = if horizontal_bias || b.x >= a.x { 1.0 } else { -1.0 };
    let c1 = a + Vec2::new(offset * dir, 0.0);
    let c2 = b - Vec2::new(offset * dir, 0.0);
    path.cubic_to(c1, c2, b);
}

/// Control offset for the path-builder beziers: `max(|dx| / 2, 50)`.
fn bezier_offset(a: Vec2, b: Vec2) -> f32 {
    ((b.x - a.x).abs() * 0.5).max(50.0)
}

/// Multi-waypoint cubic chain: the first segment exits horizontally from
/// the start port, the last enters horizontally into the end port, and
/// interior segments use 1/3–2/3 interpolated control points.
fn append_waypoint_bezier(path: &mut PathGeometry, points: &[Vec2]) {
    let last_seg = points.len() - 2;
    for (i, pair) in points.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let third = (b - a) / 3.0;
        let c1 = if i == 0 {
            a + Vec2::new(bezier_offset(a, b), 0.0)
        } else {
            a + third
        };
        let c2 = if i == last_seg {
            b - Vec2::new(bezier_offset(a, b), 0.0)
        } else {
            b - third
        };
        path.cubic_to(c1, c2, b);
    }
}

/// Standalone single-segment bezier with an explicit bias choice, for
/// callers outside the edge-kind dispatch (drag previews, custom
/// renderers). `build_edge_path` always uses the horizontal bias since
/// default ports sit on left/right sides.
pub fn bezier_segment(a: Vec2, b: Vec2, horizontal_bias: bool) -> PathGeometry {
    let mut path = PathGeometry::new();
    path.move_to(a);
    append_bezier(&mut path, a, b, horizontal_bias);
    path
}

/// Arrow-marker geometry: two wings splayed 30 degrees either side of the
/// approach direction, tip at `tip`. `ArrowClosed` closes the triangle.
///
/// `direction` points *along the edge toward the tip* and need not be
/// normalized. Returns `None` for `MarkerKind::None` or a degenerate
/// direction.
pub fn build_marker(tip: Vec2, direction: Vec2, size: f32, kind: MarkerKind) -> Option<PathGeometry> {
    if kind == MarkerKind::None {
        return None;
    }
    let dir = direction.normalize_or_zero();
    if dir == Vec2::ZERO {
        return None;
    }

    let splay = 30.0_f32.to_radians();
    let (sin, cos) = splay.sin_cos();
    // Back-vectors rotated +/- 30 degrees off the reversed approach.
    let back = -dir * size;
    let wing_a = tip + Vec2::new(back.x * cos - back.y * sin, back.x * sin + back.y * cos);
    let wing_b = tip + Vec2::new(back.x * cos + back.y * sin, -back.x * sin + back.y * cos);

    let mut path = PathGeometry::new();
    match kind {
        MarkerKind::Arrow => {
            path.move_to(wing_a).line_to(tip).line_to(wing_b);
        }
        MarkerKind::ArrowClosed => {
            path.move_to(tip).line_to(wing_a).line_to(wing_b).close();
        }
        MarkerKind::None => unreachable!(),
    }
    Some(path)
}
