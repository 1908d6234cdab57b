//! End-to-end properties of the distance-field evaluators.
//!
//! Verifies:
//! - Holes ("O") come out as outside in both modes
//! - Pixels on a straight contour encode to 0.5 in the true-distance channel
//! - MSDF and EDT agree on inside/outside for every pixel
//! - Sharp corners get more than one channel color

use logos_sdf::{
    color_shape, generate_msdf, rasterize_mask, EdgeColor, Framing, PathCommand, PixelFormat,
    Point, SdfConfig, SdfGenerator, SdfMode, Shape,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Square outer contour with a counter-wound square hole.
fn letter_o() -> Shape {
    Shape::from_commands(vec![
        PathCommand::MoveTo(pt(0.0, 0.0)),
        PathCommand::LineTo(pt(20.0, 0.0)),
        PathCommand::LineTo(pt(20.0, 20.0)),
        PathCommand::LineTo(pt(0.0, 20.0)),
        PathCommand::Close,
        PathCommand::MoveTo(pt(6.0, 6.0)),
        PathCommand::LineTo(pt(6.0, 14.0)),
        PathCommand::LineTo(pt(14.0, 14.0)),
        PathCommand::LineTo(pt(14.0, 6.0)),
        PathCommand::Close,
    ])
}

// ─── Topology ────────────────────────────────────────────────────────────────

#[test]
fn test_hole_is_outside_in_both_modes() {
    for mode in [SdfMode::Msdf, SdfMode::Sdf] {
        let generator = SdfGenerator::new(SdfConfig { mode, ..SdfConfig::for_testing() }).unwrap();
        let out = generator.generate_outline(letter_o()).unwrap().unwrap();
        assert_eq!(out.raster.format, mode.pixel_format());

        // 20 units + 2 px padding on each side.
        assert_eq!((out.raster.width, out.raster.height), (24, 24));

        let channel = out.raster.format.bytes_per_pixel() - 1;
        let hole = out.raster.pixel(12, 12)[channel];
        let ring = out.raster.pixel(4, 12)[channel];
        assert!(hole < 128, "{mode:?}: hole center encoded {hole}");
        assert!(ring > 128, "{mode:?}: ring encoded {ring}");
    }
}

#[test]
fn test_msdf_and_mask_agree_on_sign() {
    let mut shape = letter_o();
    color_shape(&mut shape);
    let framing = Framing { scale: 1.0, translate: pt(2.0, 2.0), flip_y: false };
    let raster = generate_msdf(&shape, &framing, 24, 24, 3.0).unwrap();
    let mask = rasterize_mask(&shape, &framing, 24, 24).unwrap();

    for y in 0..24 {
        for x in 0..24 {
            let alpha = raster.pixel(x, y)[3];
            if mask.get(x, y) {
                assert!(alpha >= 128, "({x}, {y}) inside but alpha {alpha}");
            } else {
                assert!(alpha <= 127, "({x}, {y}) outside but alpha {alpha}");
            }
        }
    }
}

// ─── Boundary value ─────────────────────────────────────────────────────────

#[test]
fn test_true_distance_is_half_on_contour() {
    // Horizontal edge y = 4 runs through the centers of row 4 when the
    // framing shifts by half a pixel vertically.
    let mut shape = Shape::from_commands(vec![
        PathCommand::MoveTo(pt(0.0, 4.0)),
        PathCommand::LineTo(pt(16.0, 4.0)),
        PathCommand::LineTo(pt(16.0, 12.0)),
        PathCommand::LineTo(pt(0.0, 12.0)),
        PathCommand::Close,
    ]);
    color_shape(&mut shape);
    let framing = Framing { scale: 1.0, translate: pt(0.0, 0.5), flip_y: false };
    let raster = generate_msdf(&shape, &framing, 16, 16, 4.0).unwrap();
    assert_eq!(raster.format, PixelFormat::Rgba8);
    for x in 2..14 {
        let alpha = raster.pixel(x, 4)[3] as f64;
        assert!((alpha - 127.5).abs() <= 1.0, "x = {x}: alpha {alpha}");
    }
}

// ─── Coloring ────────────────────────────────────────────────────────────────

#[test]
fn test_sharp_glyph_uses_several_channels() {
    let mut shape = letter_o();
    color_shape(&mut shape);
    for contour in &shape.contours {
        let distinct: std::collections::HashSet<_> =
            contour.segments.iter().map(|s| s.color.bits()).collect();
        assert!(distinct.len() >= 2);
        assert!(contour.segments.iter().all(|s| s.color != EdgeColor::WHITE));
    }
}

#[test]
fn test_independent_generations_are_identical() {
    let a = SdfGenerator::new(SdfConfig::default()).unwrap();
    let b = SdfGenerator::new(SdfConfig::default()).unwrap();
    let ra = a.generate_outline(letter_o()).unwrap().unwrap();
    let rb = b.generate_outline(letter_o()).unwrap().unwrap();
    assert_eq!(ra.raster.data, rb.raster.data);
}
