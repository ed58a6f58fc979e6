//! Bounding-box trait.

use crate::rect::Rect;

/// A type with an axis-aligned bounding box.
pub trait Bbox {
    /// The smallest rectangle covering this object, or [`None`] if the
    /// object is empty.
    fn bbox(&self) -> Option<Rect>;
}

impl<T: Bbox> Bbox for [T] {
    fn bbox(&self) -> Option<Rect> {
        self.iter()
            .filter_map(|item| item.bbox())
            .reduce(|a, b| a.union(b))
    }
}
