//! Simple (non-self-intersecting) integer-coordinate polygons.

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::point::{on_segment, orient, Point};
use crate::rect::Rect;

/// A simple polygon given by its vertices in order.
///
/// The polygon is implicitly closed: an edge connects the last vertex back
/// to the first.
#[derive(Debug, Default, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon with the given vertices.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 3 vertices are given.
    pub fn from_verts(points: Vec<Point>) -> Self {
        assert!(points.len() >= 3, "a polygon requires at least 3 vertices");
        Self { points }
    }

    /// The vertices of the polygon.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// An iterator over the closed edge list of the polygon.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// The area of the polygon, in square database units.
    pub fn area(&self) -> f64 {
        let mut double_area: i128 = 0;
        for (a, b) in self.edges() {
            double_area += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
        }
        (double_area.abs() as f64) / 2.0
    }

    /// The perimeter of the polygon, in database units.
    pub fn perimeter(&self) -> f64 {
        self.edges()
            .map(|(a, b)| {
                let dx = (b.x - a.x) as f64;
                let dy = (b.y - a.y) as f64;
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    /// Returns `true` if `p` lies inside or on the boundary of this polygon.
    pub fn contains_point(&self, p: Point) -> bool {
        for (a, b) in self.edges() {
            if orient(a, b, p) == 0 && on_segment(a, b, p) {
                return true;
            }
        }
        // Ray cast towards +x. Boundary cases were handled above, so the
        // usual half-open edge rule is safe here.
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                // x-coordinate of the edge at height p.y, compared without division.
                let dy = b.y - a.y;
                let t = (p.y - a.y) * (b.x - a.x) - (p.x - a.x) * dy;
                if (dy > 0 && t > 0) || (dy < 0 && t < 0) {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

impl Bbox for Polygon {
    fn bbox(&self) -> Option<Rect> {
        let left = self.points.iter().map(|p| p.x).min()?;
        let right = self.points.iter().map(|p| p.x).max()?;
        let bot = self.points.iter().map(|p| p.y).min()?;
        let top = self.points.iter().map(|p| p.y).max()?;
        Some(Rect::from_sides(left, bot, right, top))
    }
}

impl From<Rect> for Polygon {
    fn from(r: Rect) -> Self {
        Polygon::from_verts(r.corners().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_shape() -> Polygon {
        Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(20, 0),
            Point::new(20, 10),
            Point::new(10, 10),
            Point::new(10, 20),
            Point::new(0, 20),
        ])
    }

    #[test]
    fn area_and_perimeter() {
        let p = l_shape();
        assert_eq!(p.area(), 300.0);
        assert_eq!(p.perimeter(), 80.0);
    }

    #[test]
    fn containment() {
        let p = l_shape();
        assert!(p.contains_point(Point::new(5, 5)));
        assert!(p.contains_point(Point::new(5, 15)));
        // Boundary counts as inside.
        assert!(p.contains_point(Point::new(20, 5)));
        assert!(p.contains_point(Point::new(0, 0)));
        // The notch of the L is outside.
        assert!(!p.contains_point(Point::new(15, 15)));
        assert!(!p.contains_point(Point::new(-1, 5)));
    }

    #[test]
    fn bbox() {
        assert_eq!(l_shape().bbox(), Some(Rect::from_sides(0, 0, 20, 20)));
    }
}
