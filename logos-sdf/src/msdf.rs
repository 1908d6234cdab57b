//! Vector-path evaluator — multi-channel signed distance field.
//!
//! For every output pixel:
//!
//! ```text
//! pixel center ──framing──► p
//!   R/G/B: min |d(p, seg)| over segments whose color has the channel
//!          (global min when no segment carries it)
//!   A:     global min |d(p, seg)|            (true distance)
//!   sign:  + inside (nonzero winding), − outside
//!   byte:  127.5 + 127.5 · d / range, rounded and clamped
//! ```
//!
//! Pixels are independent, so rows can be split across threads with no
//! shared mutable state. Cost is O(pixels × segments).

use crate::error::SdfError;
use crate::geometry::{EdgeColor, Point};
use crate::raster::{check_dimensions, Framing, PixelFormat, SdfRaster};
use crate::shape::Shape;

const CHANNELS: [EdgeColor; 3] = [EdgeColor::RED, EdgeColor::GREEN, EdgeColor::BLUE];

/// Encode a signed distance as a byte, mapping [-range, range] → [0, 255].
#[inline]
pub fn encode_distance(distance: f64, range: f64) -> u8 {
    let v = 127.5 + 127.5 * (distance / range);
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Signed per-channel distances at `p`: `[r, g, b, true]`.
pub fn signed_distances(shape: &Shape, p: Point) -> [f64; 4] {
    let mut channel = [f64::INFINITY; 3];
    let mut global = f64::INFINITY;
    for seg in shape.segments() {
        let d = seg.distance(p);
        global = global.min(d);
        for (slot, color) in channel.iter_mut().zip(CHANNELS) {
            if seg.color.contains(color) {
                *slot = slot.min(d);
            }
        }
    }
    let sign = if shape.contains(p) { 1.0 } else { -1.0 };
    let pick = |d: f64| sign * if d.is_finite() { d } else { global };
    [pick(channel[0]), pick(channel[1]), pick(channel[2]), sign * global]
}

/// Generate an RGBA multi-channel field for an already colored `shape`.
pub fn generate_msdf(
    shape: &Shape,
    framing: &Framing,
    width: u32,
    height: u32,
    range: f64,
) -> Result<SdfRaster, SdfError> {
    generate_msdf_parallel(shape, framing, width, height, range, 1)
}

/// Same as [`generate_msdf`], splitting rows over up to `threads` scoped
/// threads. Output is byte-identical regardless of the thread count.
pub fn generate_msdf_parallel(
    shape: &Shape,
    framing: &Framing,
    width: u32,
    height: u32,
    range: f64,
    threads: usize,
) -> Result<SdfRaster, SdfError> {
    check_dimensions(width, height)?;
    check_range(range)?;

    let mut raster = SdfRaster::new(width, height, PixelFormat::Rgba8)?;
    let stride = raster.stride();
    let threads = threads.clamp(1, height as usize);

    if threads == 1 {
        for (row, out) in raster.data.chunks_mut(stride).enumerate() {
            fill_row(shape, framing, height, row as u32, range, out);
        }
    } else {
        let rows_per_chunk = (height as usize).div_ceil(threads);
        std::thread::scope(|scope| {
            for (chunk_idx, chunk) in raster.data.chunks_mut(rows_per_chunk * stride).enumerate() {
                scope.spawn(move || {
                    let first_row = chunk_idx * rows_per_chunk;
                    for (i, out) in chunk.chunks_mut(stride).enumerate() {
                        fill_row(shape, framing, height, (first_row + i) as u32, range, out);
                    }
                });
            }
        });
    }

    log::trace!(
        "msdf {width}x{height}: {} segments, {threads} thread(s)",
        shape.segment_count()
    );
    Ok(raster)
}

fn fill_row(shape: &Shape, framing: &Framing, height: u32, row: u32, range: f64, out: &mut [u8]) {
    for (col, px) in out.chunks_exact_mut(4).enumerate() {
        let p = framing.pixel_to_shape(col as u32, row, height);
        let d = signed_distances(shape, p);
        for (byte, value) in px.iter_mut().zip(d) {
            *byte = encode_distance(value, range);
        }
    }
}

pub(crate) fn check_range(range: f64) -> Result<(), SdfError> {
    if !(range.is_finite() && range > 0.0) {
        return Err(SdfError::InvalidRange(range));
    }
    Ok(())
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coloring::color_shape;
    use crate::shape::PathCommand;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn square(x0: f64, y0: f64, size: f64) -> Shape {
        let mut shape = Shape::from_commands(vec![
            PathCommand::MoveTo(pt(x0, y0)),
            PathCommand::LineTo(pt(x0 + size, y0)),
            PathCommand::LineTo(pt(x0 + size, y0 + size)),
            PathCommand::LineTo(pt(x0, y0 + size)),
            PathCommand::Close,
        ]);
        color_shape(&mut shape);
        shape
    }

    #[test]
    fn test_encode_distance_mapping() {
        assert_eq!(encode_distance(-4.0, 4.0), 0);
        assert_eq!(encode_distance(4.0, 4.0), 255);
        assert_eq!(encode_distance(10.0, 4.0), 255);
        assert_eq!(encode_distance(f64::NEG_INFINITY, 4.0), 0);
        let zero = encode_distance(0.0, 4.0) as f64;
        assert!((zero - 127.5).abs() <= 1.0);
    }

    #[test]
    fn test_sign_inside_outside() {
        let shape = square(0.0, 0.0, 10.0);
        let inside = signed_distances(&shape, pt(5.0, 3.0));
        assert!((inside[3] - 3.0).abs() < 1e-12);
        let outside = signed_distances(&shape, pt(12.0, 5.0));
        assert!((outside[3] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_white_contour_channels_match_true_distance() {
        // A circle-ish smooth contour is all white: channels == alpha.
        let r = 6.0;
        let k = 0.552_284_749_8 * r;
        let mut shape = Shape::from_commands(vec![
            PathCommand::MoveTo(pt(r, 0.0)),
            PathCommand::CubicTo(pt(r, k), pt(k, r), pt(0.0, r)),
            PathCommand::CubicTo(pt(-k, r), pt(-r, k), pt(-r, 0.0)),
            PathCommand::CubicTo(pt(-r, -k), pt(-k, -r), pt(0.0, -r)),
            PathCommand::CubicTo(pt(k, -r), pt(r, -k), pt(r, 0.0)),
            PathCommand::Close,
        ]);
        color_shape(&mut shape);
        let d = signed_distances(&shape, pt(1.0, 2.0));
        assert_eq!(d[0], d[3]);
        assert_eq!(d[1], d[3]);
        assert_eq!(d[2], d[3]);
    }

    #[test]
    fn test_missing_channel_falls_back_to_global() {
        // Single-corner contour: everything red, green/blue fall back.
        let mut shape = Shape::from_commands(vec![
            PathCommand::MoveTo(pt(0.0, 0.0)),
            PathCommand::CubicTo(pt(10.0, 10.0), pt(10.0, 20.0), pt(0.0, 20.0)),
            PathCommand::CubicTo(pt(-10.0, 20.0), pt(-10.0, 10.0), pt(0.0, 0.0)),
            PathCommand::Close,
        ]);
        color_shape(&mut shape);
        let d = signed_distances(&shape, pt(0.0, 10.0));
        assert_eq!(d[1], d[3]);
        assert_eq!(d[2], d[3]);
        assert!(d[3] > 0.0);
    }

    #[test]
    fn test_contour_pixels_encode_to_half() {
        // Edge x = 2 passes through pixel centers of column 2 when the
        // framing shifts shape space by half a pixel.
        let shape = square(2.0, 2.0, 6.0);
        let framing = Framing { scale: 1.0, translate: pt(0.5, 0.0), flip_y: false };
        let raster = generate_msdf(&shape, &framing, 12, 12, 4.0).unwrap();
        for row in 3..7 {
            let alpha = raster.pixel(2, row)[3] as f64;
            assert!((alpha - 127.5).abs() <= 1.0, "row {row}: alpha {alpha}");
        }
    }

    #[test]
    fn test_inside_brighter_than_outside() {
        let shape = square(2.0, 2.0, 8.0);
        let raster = generate_msdf(&shape, &Framing::default(), 12, 12, 3.0).unwrap();
        assert!(raster.pixel(6, 6)[3] > 128);
        assert!(raster.pixel(0, 0)[3] < 127);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let shape = square(1.0, 2.0, 9.0);
        let framing = Framing::default();
        let seq = generate_msdf(&shape, &framing, 13, 17, 4.0).unwrap();
        for threads in [2, 3, 8, 64] {
            let par = generate_msdf_parallel(&shape, &framing, 13, 17, 4.0, threads).unwrap();
            assert_eq!(seq, par, "threads = {threads}");
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let shape = square(0.0, 0.0, 4.0);
        let framing = Framing::default();
        assert!(matches!(
            generate_msdf(&shape, &framing, 0, 4, 4.0),
            Err(SdfError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            generate_msdf(&shape, &framing, 4, 4, 0.0),
            Err(SdfError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_empty_shape_is_all_outside() {
        let raster = generate_msdf(&Shape::default(), &Framing::default(), 4, 4, 4.0).unwrap();
        assert!(raster.data.iter().all(|&b| b == 0));
    }
}
