//! Integer-coordinate geometry primitives for layout processing.
//!
//! All coordinates are in database units (dbu). The types here cover the
//! subset of geometry needed for connectivity extraction: axis-aligned
//! rectangles, simple polygons, unitary (Manhattan) transformations, and
//! touch/overlap predicates with closed-interval semantics (shapes that
//! share only an edge or a corner still interact).

#![warn(missing_docs)]

pub mod bbox;
pub mod point;
pub mod polygon;
pub mod rect;
pub mod shape;
pub mod transform;

pub use bbox::Bbox;
pub use point::Point;
pub use polygon::Polygon;
pub use rect::Rect;
pub use shape::Shape;
pub use transform::{Rotation, Transformation};
