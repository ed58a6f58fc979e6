//! Axis-aligned rectangles.

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::point::Point;

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Rect {
    p0: Point,
    p1: Point,
}

impl Rect {
    /// Creates a rectangle from two corner points, sorting the coordinates.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle from all 4 sides (left, bottom, right, top).
    ///
    /// # Panics
    ///
    /// Panics if `left > right` or `bot > top`.
    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        assert!(
            left <= right && bot <= top,
            "Rect::from_sides requires left <= right and bot <= top"
        );
        Self {
            p0: Point::new(left, bot),
            p1: Point::new(right, top),
        }
    }

    /// Creates a zero-area rectangle containing the given point.
    #[inline]
    pub const fn from_point(p: Point) -> Self {
        Self { p0: p, p1: p }
    }

    /// The left (minimum x) edge coordinate.
    #[inline]
    pub const fn left(&self) -> i64 {
        self.p0.x
    }

    /// The bottom (minimum y) edge coordinate.
    #[inline]
    pub const fn bot(&self) -> i64 {
        self.p0.y
    }

    /// The right (maximum x) edge coordinate.
    #[inline]
    pub const fn right(&self) -> i64 {
        self.p1.x
    }

    /// The top (maximum y) edge coordinate.
    #[inline]
    pub const fn top(&self) -> i64 {
        self.p1.y
    }

    /// The lower-left corner.
    #[inline]
    pub const fn lower_left(&self) -> Point {
        self.p0
    }

    /// The upper-right corner.
    #[inline]
    pub const fn upper_right(&self) -> Point {
        self.p1
    }

    /// The width of the rectangle.
    #[inline]
    pub const fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// The height of the rectangle.
    #[inline]
    pub const fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// The area of the rectangle, in square database units.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() as f64 * self.height() as f64
    }

    /// The perimeter of the rectangle, in database units.
    #[inline]
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width() + self.height()) as f64
    }

    /// The intersection of this rectangle with `other`.
    ///
    /// Uses closed-interval semantics: rectangles sharing only an edge or a
    /// corner intersect in a degenerate (zero-area) rectangle.
    pub fn intersection(&self, other: Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let bot = self.bot().max(other.bot());
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());
        (left <= right && bot <= top).then(|| Rect::from_sides(left, bot, right, top))
    }

    /// Returns `true` if this rectangle touches or overlaps `other`.
    #[inline]
    pub fn touches(&self, other: Rect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.bot() <= other.top()
            && other.bot() <= self.top()
    }

    /// The smallest rectangle covering both this rectangle and `other`.
    pub fn union(&self, other: Rect) -> Rect {
        Rect::from_sides(
            self.left().min(other.left()),
            self.bot().min(other.bot()),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    /// Returns `true` if `p` lies inside or on the boundary of this rectangle.
    #[inline]
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.bot() && p.y <= self.top()
    }

    /// The four corner points, in counterclockwise order starting lower-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left(), self.bot()),
            Point::new(self.right(), self.bot()),
            Point::new(self.right(), self.top()),
            Point::new(self.left(), self.top()),
        ]
    }
}

impl Bbox for Rect {
    fn bbox(&self) -> Option<Rect> {
        Some(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_and_touch() {
        let a = Rect::from_sides(0, 0, 10, 10);
        let b = Rect::from_sides(10, 0, 20, 10);
        let c = Rect::from_sides(11, 0, 20, 10);
        // Shared edge: degenerate intersection, still touching.
        assert_eq!(a.intersection(b), Some(Rect::from_sides(10, 0, 10, 10)));
        assert!(a.touches(b));
        assert_eq!(a.intersection(c), None);
        assert!(!a.touches(c));
    }

    #[test]
    fn area_and_perimeter() {
        let r = Rect::from_sides(0, 0, 4, 3);
        assert_eq!(r.area(), 12.0);
        assert_eq!(r.perimeter(), 14.0);
    }

    #[test]
    fn point_containment_is_closed() {
        let r = Rect::from_sides(0, 0, 10, 10);
        assert!(r.contains_point(Point::new(0, 10)));
        assert!(r.contains_point(Point::new(5, 5)));
        assert!(!r.contains_point(Point::new(11, 5)));
    }
}
