//! Path shape extraction — turns a path command stream into contours.
//!
//! ```text
//! MoveTo ─┐
//! LineTo  ├──► ShapeBuilder ──► Shape { Vec<Contour { Vec<Segment> }> }
//! QuadTo  │
//! CubicTo │
//! Close  ─┘
//! ```
//!
//! Rules:
//! - `MoveTo` starts a new contour, flushing any non-empty current one.
//! - `Close` emits a line back to the start point if the pen is elsewhere,
//!   then flushes. A contour flushed without `Close` is closed the same way.
//! - Zero-length segments (all control points coincide) are dropped.
//! - An empty outline yields an empty `Shape`, which is a valid result.

use crate::geometry::{Bounds, Point, Segment};

/// One command of a glyph outline, in the glyph's local coordinate space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Control point, end point.
    QuadTo(Point, Point),
    /// First control, second control, end point.
    CubicTo(Point, Point, Point),
    Close,
}

/// An ordered loop of segments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    pub segments: Vec<Segment>,
}

impl Contour {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the last segment ends where the first one starts.
    pub fn is_closed(&self) -> bool {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => {
                first.curve().start().distance(last.curve().end()) < 1e-9
            }
            _ => false,
        }
    }

    pub fn winding(&self, p: Point) -> i32 {
        self.segments.iter().map(|s| s.winding(p)).sum()
    }
}

/// A glyph outline: zero or more closed contours.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub contours: Vec<Contour>,
}

impl Shape {
    /// Build a shape from a command stream.
    pub fn from_commands<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = PathCommand>,
    {
        let mut builder = ShapeBuilder::new();
        for command in commands {
            builder.push(command);
        }
        builder.finish()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(Contour::is_empty)
    }

    pub fn segment_count(&self) -> usize {
        self.contours.iter().map(|c| c.segments.len()).sum()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.contours.iter().flat_map(|c| c.segments.iter())
    }

    /// Total winding number of all contours around `p`.
    pub fn winding(&self, p: Point) -> i32 {
        self.contours.iter().map(|c| c.winding(p)).sum()
    }

    /// Nonzero fill rule.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.winding(p) != 0
    }

    /// Conservative bounds over every segment's control points.
    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::EMPTY;
        for seg in self.segments() {
            let b = seg.curve().bounds();
            bounds.include(Point::new(b.min_x, b.min_y));
            bounds.include(Point::new(b.max_x, b.max_y));
        }
        bounds
    }
}

/// Incremental command consumer behind [`Shape::from_commands`].
#[derive(Debug, Default)]
pub struct ShapeBuilder {
    contours: Vec<Contour>,
    current: Vec<Segment>,
    start: Point,
    pen: Point,
}

impl ShapeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: PathCommand) {
        match command {
            PathCommand::MoveTo(p) => {
                self.flush();
                self.start = p;
                self.pen = p;
            }
            PathCommand::LineTo(p) => {
                self.emit(Segment::line(self.pen, p));
            }
            PathCommand::QuadTo(c, p) => {
                self.emit(Segment::quadratic(self.pen, c, p));
            }
            PathCommand::CubicTo(c1, c2, p) => {
                self.emit(Segment::cubic(self.pen, c1, c2, p));
            }
            PathCommand::Close => {
                self.flush();
                self.pen = self.start;
            }
        }
    }

    pub fn finish(mut self) -> Shape {
        self.flush();
        Shape { contours: self.contours }
    }

    fn emit(&mut self, segment: Segment) {
        self.pen = segment.curve().end();
        if !segment.curve().is_degenerate() {
            self.current.push(segment);
        }
    }

    /// Close the current contour back to its start and move it to the shape.
    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        if self.pen != self.start {
            let closing = Segment::line(self.pen, self.start);
            if !closing.curve().is_degenerate() {
                self.current.push(closing);
            }
        }
        self.contours.push(Contour::new(std::mem::take(&mut self.current)));
        self.pen = self.start;
    }
}

// ===================================================================
// Tests
// ===================================================================
