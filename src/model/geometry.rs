//! Geometric primitives shared by every stage.
//!
//! Coordinates are in points with a top-left origin: `x` grows to the right
//! and `y` grows downward, matching the span trees produced by common PDF
//! extractors.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle `(x0, y0, x1, y1)`.
///
/// Serializes as a four-element array so that layout dumps read like the
/// `bbox` fields of an extractor's output.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from its corners.
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Rectangle anchored at the origin with the given size.
    pub const fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        self.x0 + self.width() / 2.0
    }

    /// True when every coordinate is finite and the corners are ordered.
    pub fn is_valid(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 >= self.x0
            && self.y1 >= self.y0
    }

    /// True for zero-area, inverted or non-finite rectangles.
    pub fn is_degenerate(&self) -> bool {
        !self.is_valid() || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Smallest rectangle enclosing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Union of an iterator of rectangles, `None` when it is empty.
    pub fn union_all<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, r| match acc {
                Some(u) => Some(u.union(r)),
                None => Some(*r),
            })
    }

    /// True when the interiors overlap. Rectangles that only share an edge
    /// do not intersect, and degenerate rectangles never do.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// True when `other` lies entirely inside `self` (edges inclusive).
    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }
}

impl From<[f32; 4]> for Rect {
    fn from(a: [f32; 4]) -> Self {
        Rect::new(a[0], a[1], a[2], a[3])
    }
}

impl From<Rect> for [f32; 4] {
    fn from(r: Rect) -> Self {
        [r.x0, r.y0, r.x1, r.y1]
    }
}

/// A 2D affine transformation `(a, b, c, d, e, f)`.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`, the same convention as
/// the PDF `cm` operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Horizontal scale by `sx` followed by a horizontal shift of `tx`.
    /// The vertical axis is untouched.
    pub const fn horizontal(sx: f32, tx: f32) -> Self {
        Self::new(sx, 0.0, 0.0, 1.0, tx, 0.0)
    }

    /// `self` applied first, then `then`.
    pub fn concat(&self, then: &Matrix) -> Matrix {
        Matrix::new(
            self.a * then.a + self.b * then.c,
            self.a * then.b + self.b * then.d,
            self.c * then.a + self.d * then.c,
            self.c * then.b + self.d * then.d,
            self.e * then.a + self.f * then.c + then.e,
            self.e * then.b + self.f * then.d + then.f,
        )
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Bounding box of the transformed corners.
    pub fn apply_rect(&self, r: &Rect) -> Rect {
        let corners = [
            self.apply(r.x0, r.y0),
            self.apply(r.x1, r.y0),
            self.apply(r.x0, r.y1),
            self.apply(r.x1, r.y1),
        ];
        let (mut x0, mut y0) = corners[0];
        let (mut x1, mut y1) = corners[0];
        for &(x, y) in &corners[1..] {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        Rect::new(x0, y0, x1, y1)
    }

    /// Inverse transform, `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let (a, b, c, d) = (self.d / det, -self.b / det, -self.c / det, self.a / det);
        Some(Matrix::new(
            a,
            b,
            c,
            d,
            -(self.e * a + self.f * c),
            -(self.e * b + self.f * d),
        ))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Horizontal scale of the unit vector.
    pub fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Vertical scale of the unit vector, used for effective font sizes.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_all() {
        let rects = [Rect::new(10.0, 20.0, 30.0, 40.0), Rect::new(5.0, 25.0, 50.0, 35.0)];
        assert_eq!(
            Rect::union_all(rects.iter()),
            Some(Rect::new(5.0, 20.0, 50.0, 40.0))
        );
        assert_eq!(Rect::union_all(std::iter::empty()), None);
    }

    #[test]
    fn test_intersects_ignores_shared_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!a.intersects(&Rect::new(2.0, 2.0, 2.0, 8.0)));
    }

    #[test]
    fn test_intersects_is_symmetric() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(8.0, -5.0, 12.0, 3.0);
        assert_eq!(a.intersects(&b), b.intersects(&a));
    }

    #[test]
    fn test_contains_inclusive() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&outer));
        assert!(outer.contains(&Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!outer.contains(&Rect::new(90.0, 10.0, 110.0, 20.0)));
    }

    #[test]
    fn test_degenerate() {
        assert!(Rect::new(5.0, 0.0, 5.0, 10.0).is_degenerate());
        assert!(Rect::new(6.0, 0.0, 5.0, 10.0).is_degenerate());
        assert!(Rect::new(0.0, 0.0, f32::NAN, 1.0).is_degenerate());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_degenerate());
    }

    #[test]
    fn test_horizontal_matrix_keeps_vertical_axis() {
        let m = Matrix::horizontal(0.5, 100.0);
        let r = m.apply_rect(&Rect::new(0.0, 10.0, 200.0, 20.0));
        assert_eq!(r, Rect::new(100.0, 10.0, 200.0, 20.0));
    }

    #[test]
    fn test_concat_order() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::new(1.0, 0.0, 0.0, 1.0, 10.0, 0.0);
        // scale first, then shift
        assert_eq!(scale.concat(&shift).apply(1.0, 1.0), (12.0, 2.0));
        // shift first, then scale
        assert_eq!(shift.concat(&scale).apply(1.0, 1.0), (22.0, 2.0));
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = Matrix::horizontal(0.9, 30.0);
        let inv = m.inverse().unwrap();
        let (x, y) = inv.apply(m.apply(75.0, 12.0).0, m.apply(75.0, 12.0).1);
        assert!((x - 75.0).abs() < 1e-4);
        assert!((y - 12.0).abs() < 1e-4);
        assert!(Matrix::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0).inverse().is_none());
    }

    #[test]
    fn test_rect_serializes_as_array() {
        let json = serde_json::to_string(&Rect::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: Rect = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(back, Rect::new(1.0, 2.0, 3.0, 4.0));
    }
}
