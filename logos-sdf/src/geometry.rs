//! Geometry primitives — points, edge colors, and curve segments.
//!
//! Every segment answers three questions about a query point:
//!
//! ```text
//! Segment ── distance(p)  → Euclidean distance to the curve
//!         ├─ winding(p)   → signed crossings of the ray p → +x
//!         └─ direction(t) → tangent (used for corner detection)
//! ```
//!
//! Lines are solved exactly. Quadratic and cubic distance uses a fixed
//! sample budget of [`CURVE_SAMPLES`] parameter steps; this is a known
//! accuracy/speed trade-off and is accurate enough for glyph cells a few
//! dozen pixels across.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Parameter steps used for the quadratic/cubic closest-point query.
pub const CURVE_SAMPLES: usize = 10;

/// Line pieces a cubic is flattened into for the winding test.
pub const CUBIC_WINDING_STEPS: usize = 16;

const EPSILON: f64 = 1e-12;

// ───────────────────────────────────────────────────────────────────
// Point
// ───────────────────────────────────────────────────────────────────

/// 2-D point / vector in shape space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline(always)]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline(always)]
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[inline(always)]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[inline(always)]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    #[inline(always)]
    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Point {
        let len = self.length();
        if len > EPSILON {
            Point::new(self.x / len, self.y / len)
        } else {
            Point::default()
        }
    }

    #[inline(always)]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }

    #[inline(always)]
    fn is_zero(self) -> bool {
        self.length_squared() <= EPSILON
    }
}

impl Add for Point {
    type Output = Point;

    #[inline(always)]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline(always)]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    #[inline(always)]
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    #[inline(always)]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

// ───────────────────────────────────────────────────────────────────
// Bounds
// ───────────────────────────────────────────────────────────────────

/// Axis-aligned bounding box in shape space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// An inverted box that any `include` call will replace.
    pub const EMPTY: Bounds = Bounds {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    #[inline(always)]
    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    #[inline(always)]
    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }
}

// ───────────────────────────────────────────────────────────────────
// Edge color
// ───────────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Channel subset a segment contributes to in a multi-channel field.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EdgeColor: u8 {
        const RED = 0b001;
        const GREEN = 0b010;
        const BLUE = 0b100;
        const WHITE = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
    }
}

impl Default for EdgeColor {
    fn default() -> Self {
        Self::WHITE
    }
}

// ───────────────────────────────────────────────────────────────────
// Curve
// ───────────────────────────────────────────────────────────────────

/// Geometric payload of a segment. Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Curve {
    Line([Point; 2]),
    Quadratic([Point; 3]),
    Cubic([Point; 4]),
}

impl Curve {
    pub fn start(&self) -> Point {
        match self {
            Curve::Line(p) => p[0],
            Curve::Quadratic(p) => p[0],
            Curve::Cubic(p) => p[0],
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Curve::Line(p) => p[1],
            Curve::Quadratic(p) => p[2],
            Curve::Cubic(p) => p[3],
        }
    }

    /// Control points, including both endpoints.
    pub fn points(&self) -> &[Point] {
        match self {
            Curve::Line(p) => p,
            Curve::Quadratic(p) => p,
            Curve::Cubic(p) => p,
        }
    }

    /// True when every control point coincides (a zero-length segment).
    pub fn is_degenerate(&self) -> bool {
        let start = self.start();
        self.points().iter().all(|p| (*p - start).is_zero())
    }

    /// Point on the curve at parameter `t` in [0, 1].
    pub fn point(&self, t: f64) -> Point {
        match *self {
            Curve::Line([a, b]) => a.lerp(b, t),
            Curve::Quadratic([p0, p1, p2]) => {
                let mt = 1.0 - t;
                p0 * (mt * mt) + p1 * (2.0 * mt * t) + p2 * (t * t)
            }
            Curve::Cubic([p0, p1, p2, p3]) => {
                let mt = 1.0 - t;
                p0 * (mt * mt * mt)
                    + p1 * (3.0 * mt * mt * t)
                    + p2 * (3.0 * mt * t * t)
                    + p3 * (t * t * t)
            }
        }
    }

    /// Tangent at parameter `t` (not normalized).
    pub fn direction(&self, t: f64) -> Point {
        match *self {
            Curve::Line([a, b]) => b - a,
            Curve::Quadratic([p0, p1, p2]) => {
                let d = (p1 - p0) * (2.0 * (1.0 - t)) + (p2 - p1) * (2.0 * t);
                if d.is_zero() { p2 - p0 } else { d }
            }
            Curve::Cubic([p0, p1, p2, p3]) => {
                let mt = 1.0 - t;
                let d = (p1 - p0) * (3.0 * mt * mt)
                    + (p2 - p1) * (6.0 * mt * t)
                    + (p3 - p2) * (3.0 * t * t);
                if d.is_zero() { p3 - p0 } else { d }
            }
        }
    }

    /// Tangent leaving the start point, skipping coincident controls.
    pub fn start_direction(&self) -> Point {
        let start = self.start();
        self.points()[1..]
            .iter()
            .map(|p| *p - start)
            .find(|d| !d.is_zero())
            .unwrap_or_default()
    }

    /// Tangent arriving at the end point, skipping coincident controls.
    pub fn end_direction(&self) -> Point {
        let end = self.end();
        let points = self.points();
        points[..points.len() - 1]
            .iter()
            .rev()
            .map(|p| end - *p)
            .find(|d| !d.is_zero())
            .unwrap_or_default()
    }

    /// Minimum Euclidean distance from `p` to the curve.
    pub fn distance(&self, p: Point) -> f64 {
        match *self {
            Curve::Line([a, b]) => {
                let ab = b - a;
                let len_sq = ab.length_squared();
                if len_sq <= EPSILON {
                    return p.distance(a);
                }
                let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
                p.distance(a + ab * t)
            }
            Curve::Quadratic(_) | Curve::Cubic(_) => (0..=CURVE_SAMPLES)
                .map(|i| p.distance(self.point(i as f64 / CURVE_SAMPLES as f64)))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Signed crossings of the horizontal ray from `p` toward +x.
    ///
    /// Crossings are half-open in y (an endpoint lying exactly on the ray
    /// counts as below it), so a vertex shared by two segments is never
    /// counted twice.
    pub fn winding(&self, p: Point) -> i32 {
        match *self {
            Curve::Line([a, b]) => line_winding(a, b, p),
            Curve::Quadratic(pts) => quadratic_winding(pts, p),
            Curve::Cubic(_) => {
                let mut total = 0;
                let mut prev = self.start();
                for i in 1..=CUBIC_WINDING_STEPS {
                    let next = self.point(i as f64 / CUBIC_WINDING_STEPS as f64);
                    total += line_winding(prev, next, p);
                    prev = next;
                }
                total
            }
        }
    }

    /// Conservative bounds (control-point hull).
    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::EMPTY;
        for p in self.points() {
            bounds.include(*p);
        }
        bounds
    }
}

#[inline]
fn line_winding(a: Point, b: Point, p: Point) -> i32 {
    if (a.y > p.y) == (b.y > p.y) {
        return 0;
    }
    let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
    if x > p.x {
        if b.y > a.y { 1 } else { -1 }
    } else {
        0
    }
}

fn quadratic_winding([p0, p1, p2]: [Point; 3], p: Point) -> i32 {
    let a = p0.y - 2.0 * p1.y + p2.y;
    let b = 2.0 * (p1.y - p0.y);
    let c = p0.y - p.y;

    // Split at the y-extremum so each piece is monotonic in y.
    let mut breaks = [0.0, 1.0, 1.0];
    let mut pieces = 1;
    if a.abs() > EPSILON {
        let t_ext = (p0.y - p1.y) / a;
        if t_ext > 0.0 && t_ext < 1.0 {
            breaks = [0.0, t_ext, 1.0];
            pieces = 2;
        }
    }

    let curve = Curve::Quadratic([p0, p1, p2]);
    let mut total = 0;
    for i in 0..pieces {
        let (ta, tb) = (breaks[i], breaks[i + 1]);
        let ya = curve.point(ta).y;
        let yb = curve.point(tb).y;
        if (ya > p.y) == (yb > p.y) {
            continue;
        }
        let t = solve_in_range(a, b, c, ta, tb);
        if curve.point(t).x > p.x {
            total += if yb > ya { 1 } else { -1 };
        }
    }
    total
}

/// Root of `a t² + b t + c = 0` closest to `[lo, hi]`, clamped into it.
fn solve_in_range(a: f64, b: f64, c: f64, lo: f64, hi: f64) -> f64 {
    let outside = |t: f64| (lo - t).max(t - hi).max(0.0);
    let best = if a.abs() <= EPSILON {
        if b.abs() <= EPSILON { lo } else { -c / b }
    } else {
        let disc = (b * b - 4.0 * a * c).max(0.0).sqrt();
        let r1 = (-b - disc) / (2.0 * a);
        let r2 = (-b + disc) / (2.0 * a);
        if outside(r1) <= outside(r2) { r1 } else { r2 }
    };
    best.clamp(lo, hi)
}

// ───────────────────────────────────────────────────────────────────
// Segment
// ───────────────────────────────────────────────────────────────────

/// A curve plus the channel label assigned during edge coloring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    curve: Curve,
    pub color: EdgeColor,
}

impl Segment {
    pub fn new(curve: Curve) -> Self {
        Self { curve, color: EdgeColor::WHITE }
    }

    pub fn line(a: Point, b: Point) -> Self {
        Self::new(Curve::Line([a, b]))
    }

    pub fn quadratic(p0: Point, p1: Point, p2: Point) -> Self {
        Self::new(Curve::Quadratic([p0, p1, p2]))
    }

    pub fn cubic(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self::new(Curve::Cubic([p0, p1, p2, p3]))
    }

    #[inline(always)]
    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    #[inline(always)]
    pub fn distance(&self, p: Point) -> f64 {
        self.curve.distance(p)
    }

    #[inline(always)]
    pub fn winding(&self, p: Point) -> i32 {
        self.curve.winding(p)
    }
}

// ===================================================================
// Tests
// ===================================================================
