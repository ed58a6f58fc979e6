//! An enumeration of geometric shapes and their properties.

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::point::{segments_intersect, Point};
use crate::polygon::Polygon;
use crate::rect::Rect;
use crate::transform::Transformation;

/// An enumeration of geometric shapes.
#[derive(Debug, Clone, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub enum Shape {
    /// A rectangle.
    Rect(Rect),
    /// A polygon.
    Polygon(Polygon),
}

impl Shape {
    /// If this shape is a rectangle, returns the contained rectangle.
    pub fn rect(&self) -> Option<Rect> {
        match self {
            Self::Rect(r) => Some(*r),
            _ => None,
        }
    }

    /// If this shape is a polygon, returns the contained polygon.
    pub fn polygon(&self) -> Option<&Polygon> {
        match self {
            Self::Polygon(p) => Some(p),
            _ => None,
        }
    }

    /// The area of the shape, in square database units.
    pub fn area(&self) -> f64 {
        match self {
            Self::Rect(r) => r.area(),
            Self::Polygon(p) => p.area(),
        }
    }

    /// The perimeter of the shape, in database units.
    pub fn perimeter(&self) -> f64 {
        match self {
            Self::Rect(r) => r.perimeter(),
            Self::Polygon(p) => p.perimeter(),
        }
    }

    /// Returns `true` if `p` lies inside or on the boundary of this shape.
    pub fn contains_point(&self, p: Point) -> bool {
        match self {
            Self::Rect(r) => r.contains_point(p),
            Self::Polygon(poly) => poly.contains_point(p),
        }
    }

    /// Returns `true` if this shape touches or overlaps `other`.
    ///
    /// Uses closed-interval semantics: shapes sharing only an edge or a
    /// corner still interact.
    pub fn interacts(&self, other: &Shape) -> bool {
        let (Some(b1), Some(b2)) = (self.bbox(), other.bbox()) else {
            return false;
        };
        if !b1.touches(b2) {
            return false;
        }
        match (self, other) {
            // The bbox test is exact for two rectangles.
            (Self::Rect(_), Self::Rect(_)) => true,
            _ => polygons_interact(self, other),
        }
    }

    /// This shape transformed by `trans`.
    ///
    /// Rectangles stay rectangles because transformations are Manhattan.
    pub fn transform(&self, trans: Transformation) -> Shape {
        match self {
            Self::Rect(r) => Shape::Rect(Rect::new(
                trans.apply(r.lower_left()),
                trans.apply(r.upper_right()),
            )),
            Self::Polygon(p) => Shape::Polygon(Polygon::from_verts(
                p.points().iter().map(|&v| trans.apply(v)).collect(),
            )),
        }
    }
}

/// Exact interaction test when at least one operand is a polygon.
fn polygons_interact(a: &Shape, b: &Shape) -> bool {
    let va = vertices(a);
    let vb = vertices(b);
    if va.iter().any(|&p| b.contains_point(p)) || vb.iter().any(|&p| a.contains_point(p)) {
        return true;
    }
    let na = va.len();
    let nb = vb.len();
    for i in 0..na {
        for j in 0..nb {
            if segments_intersect(va[i], va[(i + 1) % na], vb[j], vb[(j + 1) % nb]) {
                return true;
            }
        }
    }
    false
}

fn vertices(s: &Shape) -> Vec<Point> {
    match s {
        Shape::Rect(r) => r.corners().to_vec(),
        Shape::Polygon(p) => p.points().to_vec(),
    }
}

impl Bbox for Shape {
    fn bbox(&self) -> Option<Rect> {
        match self {
            Self::Rect(r) => r.bbox(),
            Self::Polygon(p) => p.bbox(),
        }
    }
}

impl From<Rect> for Shape {
    #[inline]
    fn from(value: Rect) -> Self {
        Self::Rect(value)
    }
}

impl From<Polygon> for Shape {
    #[inline]
    fn from(value: Polygon) -> Self {
        Self::Polygon(value)
    }
}
