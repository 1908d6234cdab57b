//! Edge coloring for multi-channel distance fields.
//!
//! A boundary between two segments is a *corner* when the dot product of
//! the incoming end tangent and the outgoing start tangent (both
//! normalized) falls below [`CORNER_DOT_THRESHOLD`]. Smooth contours stay
//! white; otherwise the color cycles Red → Green → Blue → Red … at every
//! corner, starting from the first corner.
//!
//! ```text
//!   corner      corner      corner
//!     ▼  RED      ▼  GREEN    ▼  BLUE
//!     ●──────────●───────────●──────────● …
//! ```

use crate::geometry::EdgeColor;
use crate::shape::{Contour, Shape};

/// Tangent dot product below which a boundary counts as a corner
/// (roughly a 25° turn).
pub const CORNER_DOT_THRESHOLD: f64 = 0.9;

const CYCLE: [EdgeColor; 3] = [EdgeColor::RED, EdgeColor::GREEN, EdgeColor::BLUE];

/// Color every contour of `shape` in place.
pub fn color_shape(shape: &mut Shape) {
    for contour in &mut shape.contours {
        color_contour(contour);
    }
}

/// Indices `i` such that the boundary entering segment `i` is a corner.
pub fn detect_corners(contour: &Contour) -> Vec<usize> {
    let segments = &contour.segments;
    let n = segments.len();
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .filter(|&i| {
            let prev = &segments[(i + n - 1) % n];
            let incoming = prev.curve().end_direction().normalized();
            let outgoing = segments[i].curve().start_direction().normalized();
            incoming.dot(outgoing) < CORNER_DOT_THRESHOLD
        })
        .collect()
}

/// Assign a channel subset to every segment of `contour`.
pub fn color_contour(contour: &mut Contour) {
    let corners = detect_corners(contour);
    let n = contour.segments.len();

    if corners.is_empty() {
        for seg in &mut contour.segments {
            seg.color = EdgeColor::WHITE;
        }
        return;
    }

    let mut is_corner = vec![false; n];
    for &c in &corners {
        is_corner[c] = true;
    }

    // Runs are numbered 0..corners.len(); the last run wraps into the first.
    let runs = corners.len();
    let first = corners[0];
    let mut run = 0;
    for k in 0..n {
        let idx = (first + k) % n;
        if k > 0 && is_corner[idx] {
            run += 1;
        }
        contour.segments[idx].color = CYCLE[run % CYCLE.len()];
    }
    log::trace!("colored contour: {n} segments, {runs} corners");
}

// ===================================================================
// Tests
// ===================================================================
