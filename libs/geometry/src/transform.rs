//! Unitary (Manhattan) transformations.

use serde::{Deserialize, Serialize};

use crate::point::Point;

/// A Manhattan rotation: 0, 90, 180, or 270 degrees counterclockwise.
#[derive(Debug, Clone, Copy, Default, Hash, Eq, Ord, PartialOrd, PartialEq, Serialize, Deserialize)]
pub enum Rotation {
    /// 0 degrees; no rotation.
    #[default]
    R0,
    /// 90 degrees counterclockwise.
    R90,
    /// 180 degrees counterclockwise.
    R180,
    /// 270 degrees counterclockwise.
    R270,
}

/// A matrix representing a unitary transformation.
///
/// Can represent Manhattan rotations, reflections, and combinations thereof.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub(crate) struct TransformationMatrix([[i8; 2]; 2]);

impl TransformationMatrix {
    pub(crate) fn identity() -> Self {
        Self([[1, 0], [0, 1]])
    }

    /// The matrix for the given rotation, optionally preceded by a
    /// reflection about the x-axis.
    pub(crate) fn from_parts(rotation: Rotation, mirror: bool) -> Self {
        let r = match rotation {
            Rotation::R0 => Self([[1, 0], [0, 1]]),
            Rotation::R90 => Self([[0, -1], [1, 0]]),
            Rotation::R180 => Self([[-1, 0], [0, -1]]),
            Rotation::R270 => Self([[0, 1], [-1, 0]]),
        };
        if mirror {
            r.mul(Self([[1, 0], [0, -1]]))
        } else {
            r
        }
    }

    pub(crate) fn mul(self, rhs: Self) -> Self {
        let a = self.0;
        let b = rhs.0;
        Self([
            [
                a[0][0] * b[0][0] + a[0][1] * b[1][0],
                a[0][0] * b[0][1] + a[0][1] * b[1][1],
            ],
            [
                a[1][0] * b[0][0] + a[1][1] * b[1][0],
                a[1][0] * b[0][1] + a[1][1] * b[1][1],
            ],
        ])
    }

    /// The inverse of this matrix.
    ///
    /// Unitary matrices are orthogonal, so the inverse is the transpose.
    pub(crate) fn inverse(self) -> Self {
        let m = self.0;
        Self([[m[0][0], m[1][0]], [m[0][1], m[1][1]]])
    }

    pub(crate) fn apply(self, p: Point) -> Point {
        let m = self.0;
        Point::new(
            m[0][0] as i64 * p.x + m[0][1] as i64 * p.y,
            m[1][0] as i64 * p.x + m[1][1] as i64 * p.y,
        )
    }
}

/// A transformation representing a Manhattan translation, rotation, and/or
/// reflection of geometry.
///
/// Does not support scaling: all transformation matrices are unitary.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    mat: TransformationMatrix,
    b: Point,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation {
    /// The identity transformation.
    pub fn identity() -> Self {
        Self {
            mat: TransformationMatrix::identity(),
            b: Point::zero(),
        }
    }

    /// A pure translation by `offset`.
    pub fn translate(offset: Point) -> Self {
        Self {
            mat: TransformationMatrix::identity(),
            b: offset,
        }
    }

    /// A transformation that reflects about the x-axis (if `mirror` is set),
    /// then rotates by `rotation`, then translates by `offset`.
    pub fn from_parts(offset: Point, rotation: Rotation, mirror: bool) -> Self {
        Self {
            mat: TransformationMatrix::from_parts(rotation, mirror),
            b: offset,
        }
    }

    /// The composite transformation applying `first`, then `second`.
    pub fn cascade(first: Transformation, second: Transformation) -> Self {
        Self {
            mat: second.mat.mul(first.mat),
            b: second.mat.apply(first.b) + second.b,
        }
    }

    /// The inverse of this transformation.
    pub fn inverse(&self) -> Self {
        let inv = self.mat.inverse();
        Self {
            mat: inv,
            b: -inv.apply(self.b),
        }
    }

    /// Applies this transformation to the given point.
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        self.mat.apply(p) + self.b
    }

    /// The translation component of this transformation.
    #[inline]
    pub fn offset(&self) -> Point {
        self.b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_and_translate() {
        let t = Transformation::from_parts(Point::new(100, 0), Rotation::R90, false);
        assert_eq!(t.apply(Point::new(10, 0)), Point::new(100, 10));
        assert_eq!(t.apply(Point::new(0, 10)), Point::new(90, 0));
    }

    #[test]
    fn mirror_applies_before_rotation() {
        let t = Transformation::from_parts(Point::zero(), Rotation::R90, true);
        // (1, 0) -> mirror -> (1, 0) -> rot90 -> (0, 1)
        assert_eq!(t.apply(Point::new(1, 0)), Point::new(0, 1));
        // (0, 1) -> mirror -> (0, -1) -> rot90 -> (1, 0)
        assert_eq!(t.apply(Point::new(0, 1)), Point::new(1, 0));
    }

    #[test]
    fn cascade_matches_sequential_application() {
        let a = Transformation::from_parts(Point::new(5, -3), Rotation::R270, true);
        let b = Transformation::from_parts(Point::new(-7, 11), Rotation::R90, false);
        let c = Transformation::cascade(a, b);
        for p in [Point::new(0, 0), Point::new(13, 4), Point::new(-2, 9)] {
            assert_eq!(c.apply(p), b.apply(a.apply(p)));
        }
    }

    #[test]
    fn inverse_round_trips() {
        let t = Transformation::from_parts(Point::new(42, 17), Rotation::R180, true);
        let inv = t.inverse();
        for p in [Point::new(0, 0), Point::new(1, 2), Point::new(-100, 55)] {
            assert_eq!(inv.apply(t.apply(p)), p);
            assert_eq!(t.apply(inv.apply(p)), p);
        }
    }
}
