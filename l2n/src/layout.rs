//! The hierarchical shape store.
//!
//! [`Layout`] is the internal, layer-bucketed representation of a cell
//! hierarchy the extractor works on: cells holding shapes and text labels
//! per layer, plus placed instances of child cells. It plays the role of
//! the "deep shape store" that a recursive shape iterator over an input
//! layout is imported into; tests and embedders populate it directly.

use std::collections::HashMap;
use std::fmt::Display;

use arcstr::ArcStr;
use geometry::{Bbox, Point, Rect, Shape, Transformation};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An opaque cell identifier.
///
/// A cell ID created in the context of one layout must *not* be used in the
/// context of another layout.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellId(u64);

/// An opaque handle for a shape collection (a "deep layer") inside the
/// store.
///
/// Handles are either *original* (imported from an input layout layer) or
/// *derived* (allocated empty and filled by geometric operations); the
/// distinction is tracked by the [`LayerRegistry`](crate::layers::LayerRegistry),
/// not by the store itself.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct LayerId(u32);

impl CellId {
    /// The raw id value, for cross-crate references.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Reconstructs a cell id from its raw value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl LayerId {
    /// The raw id value, for cross-crate references.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Reconstructs a layer id from its raw value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell{}", self.0)
    }
}

impl Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer{}", self.0)
    }
}

/// A shape in the store, with an optional user property.
///
/// The property slot carries the net-name annotation written by the net
/// builder; ordinary imported shapes have none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DbShape {
    /// The geometry.
    pub geo: Shape,
    /// An optional `(key, value)` user property.
    pub property: Option<(ArcStr, ArcStr)>,
}

impl From<Shape> for DbShape {
    fn from(geo: Shape) -> Self {
        Self {
            geo,
            property: None,
        }
    }
}

/// A text label in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Text {
    /// The label string.
    pub text: ArcStr,
    /// The label position.
    pub at: Point,
}

impl Text {
    /// Creates a new text label.
    pub fn new(text: impl Into<ArcStr>, at: Point) -> Self {
        Self {
            text: text.into(),
            at,
        }
    }
}

/// An instance of a child cell placed inside a parent cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instance {
    child: CellId,
    name: ArcStr,
    trans: Transformation,
}

impl Instance {
    /// Creates a new instance of `child` with the given placement transform.
    pub fn new(child: CellId, name: impl Into<ArcStr>, trans: Transformation) -> Self {
        Self {
            child,
            name: name.into(),
            trans,
        }
    }

    /// The instantiated cell.
    #[inline]
    pub fn child(&self) -> CellId {
        self.child
    }

    /// The instance name.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The placement transform of this instance.
    #[inline]
    pub fn transformation(&self) -> Transformation {
        self.trans
    }
}

/// A cell: shapes and texts bucketed per layer, plus child instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cell {
    name: ArcStr,
    shapes: HashMap<LayerId, Vec<DbShape>>,
    texts: HashMap<LayerId, Vec<Text>>,
    instances: Vec<Instance>,
}

impl Cell {
    fn new(name: ArcStr) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// The name of the cell.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The shapes of this cell on the given layer.
    pub fn shapes_on(&self, layer: LayerId) -> &[DbShape] {
        self.shapes.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The text labels of this cell on the given layer.
    pub fn texts_on(&self, layer: LayerId) -> &[Text] {
        self.texts.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The layers this cell has shapes or texts on.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        let mut layers: Vec<LayerId> = self.shapes.keys().chain(self.texts.keys()).copied().collect();
        layers.sort_unstable();
        layers.dedup();
        layers.into_iter()
    }

    /// The child instances of this cell, in placement order.
    #[inline]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The bounding box of this cell's own shapes (instances excluded).
    pub fn local_bbox(&self) -> Option<Rect> {
        self.shapes
            .values()
            .flatten()
            .filter_map(|s| s.geo.bbox())
            .reduce(|a, b| a.union(b))
    }
}

/// A hierarchical, layer-bucketed shape store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    dbu: f64,
    cell_id: u64,
    layer_id: u32,
    cells: IndexMap<CellId, Cell>,
    name_map: HashMap<ArcStr, CellId>,
    top: Option<CellId>,
    /// Original input layer index -> backing layer handle.
    original_layers: IndexMap<u32, LayerId>,
}

impl Layout {
    /// Creates a new, empty layout with the given database unit (in µm).
    pub fn new(dbu: f64) -> Self {
        Self {
            dbu,
            cell_id: 0,
            layer_id: 0,
            cells: Default::default(),
            name_map: Default::default(),
            top: None,
            original_layers: Default::default(),
        }
    }

    /// The database unit, in µm per integer coordinate step.
    #[inline]
    pub fn dbu(&self) -> f64 {
        self.dbu
    }

    /// Adds a new, empty cell with the given name.
    pub fn add_cell(&mut self, name: impl Into<ArcStr>) -> CellId {
        self.cell_id += 1;
        let id = CellId(self.cell_id);
        let name = name.into();
        self.name_map.insert(name.clone(), id);
        self.cells.insert(id, Cell::new(name));
        id
    }

    /// Gets the cell with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no cell with the given ID exists.
    pub fn cell(&self, id: CellId) -> &Cell {
        self.try_cell(id).expect("no cell with the given id")
    }

    /// Gets the cell with the given ID.
    pub fn try_cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    /// Gets the cell ID corresponding to the given name.
    pub fn try_cell_id_named(&self, name: &str) -> Option<CellId> {
        self.name_map.get(name).copied()
    }

    /// Iterates over the `(id, cell)` pairs in this layout.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter().map(|(id, cell)| (*id, cell))
    }

    /// Marks the given cell as the top cell.
    pub fn set_top(&mut self, id: CellId) {
        self.top = Some(id);
    }

    /// The top cell, if one was designated.
    #[inline]
    pub fn top_cell(&self) -> Option<CellId> {
        self.top
    }

    /// Places an instance of a child cell inside `parent`.
    pub fn add_instance(&mut self, parent: CellId, instance: Instance) {
        debug_assert!(self.cells.contains_key(&instance.child));
        self.cells
            .get_mut(&parent)
            .expect("no cell with the given id")
            .instances
            .push(instance);
    }

    /// Allocates a new, empty layer handle.
    pub fn alloc_layer(&mut self) -> LayerId {
        self.layer_id += 1;
        LayerId(self.layer_id)
    }

    /// The layer handle backing the given original input layer index, if
    /// that index has been imported.
    pub fn original_layer(&self, index: u32) -> Option<LayerId> {
        self.original_layers.get(&index).copied()
    }

    /// Imports (or returns) the layer handle backing the given original
    /// input layer index.
    pub fn import_original_layer(&mut self, index: u32) -> LayerId {
        if let Some(layer) = self.original_layers.get(&index) {
            return *layer;
        }
        let layer = self.alloc_layer();
        self.original_layers.insert(index, layer);
        layer
    }

    /// Inserts a shape into the given cell and layer.
    pub fn insert_shape(&mut self, cell: CellId, layer: LayerId, shape: impl Into<Shape>) {
        self.insert_db_shape(cell, layer, DbShape::from(shape.into()));
    }

    /// Inserts a shape carrying a user property.
    pub fn insert_shape_with_property(
        &mut self,
        cell: CellId,
        layer: LayerId,
        shape: impl Into<Shape>,
        property: (ArcStr, ArcStr),
    ) {
        self.insert_db_shape(
            cell,
            layer,
            DbShape {
                geo: shape.into(),
                property: Some(property),
            },
        );
    }

    pub(crate) fn insert_db_shape(&mut self, cell: CellId, layer: LayerId, shape: DbShape) {
        self.cells
            .get_mut(&cell)
            .expect("no cell with the given id")
            .shapes
            .entry(layer)
            .or_default()
            .push(shape);
    }

    /// Removes all shapes and texts on the given layer, in every cell.
    pub(crate) fn remove_layer(&mut self, layer: LayerId) {
        for cell in self.cells.values_mut() {
            cell.shapes.remove(&layer);
            cell.texts.remove(&layer);
        }
    }

    /// Inserts a text label into the given cell and layer.
    pub fn insert_text(&mut self, cell: CellId, layer: LayerId, text: Text) {
        self.cells
            .get_mut(&cell)
            .expect("no cell with the given id")
            .texts
            .entry(layer)
            .or_default()
            .push(text);
    }

    /// Returns all cell IDs in bottom-up (children before parents) order.
    pub fn bottom_up(&self) -> Vec<CellId> {
        let mut order = Vec::with_capacity(self.cells.len());
        let mut seen = std::collections::HashSet::new();
        for (id, _) in self.cells.iter().map(|(id, cell)| (*id, cell)) {
            self.dfs_postorder(id, &mut seen, &mut order);
        }
        order
    }

    /// Returns the cell IDs reachable from `top`, in bottom-up order
    /// (children before parents; `top` last).
    pub fn cells_under(&self, top: CellId) -> Vec<CellId> {
        let mut order = Vec::new();
        let mut seen = std::collections::HashSet::new();
        self.dfs_postorder(top, &mut seen, &mut order);
        order
    }

    fn dfs_postorder(
        &self,
        id: CellId,
        seen: &mut std::collections::HashSet<CellId>,
        order: &mut Vec<CellId>,
    ) {
        if !seen.insert(id) {
            return;
        }
        for inst in self.cell(id).instances() {
            self.dfs_postorder(inst.child(), seen, order);
        }
        order.push(id);
    }

    /// The recursive bounding box of a cell, covering its own shapes and
    /// all placed instances.
    pub fn cell_bbox(&self, cell: CellId) -> Option<Rect> {
        let mut memo = HashMap::new();
        self.cell_bbox_memo(cell, &mut memo)
    }

    fn cell_bbox_memo(&self, id: CellId, memo: &mut HashMap<CellId, Option<Rect>>) -> Option<Rect> {
        if let Some(bbox) = memo.get(&id) {
            return *bbox;
        }
        let cell = self.cell(id);
        let mut bbox = cell.local_bbox();
        for inst in cell.instances() {
            if let Some(child) = self.cell_bbox_memo(inst.child(), memo) {
                let t = inst.transformation();
                let moved = Rect::new(t.apply(child.lower_left()), t.apply(child.upper_right()));
                bbox = Some(match bbox {
                    Some(b) => b.union(moved),
                    None => moved,
                });
            }
        }
        memo.insert(id, bbox);
        bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::Rotation;

    #[test]
    fn bottom_up_orders_children_first() {
        let mut layout = Layout::new(0.001);
        let leaf = layout.add_cell("leaf");
        let mid = layout.add_cell("mid");
        let top = layout.add_cell("top");
        layout.add_instance(mid, Instance::new(leaf, "l1", Transformation::identity()));
        layout.add_instance(top, Instance::new(mid, "m1", Transformation::identity()));
        layout.set_top(top);

        let order = layout.cells_under(top);
        assert_eq!(order, vec![leaf, mid, top]);
    }

    #[test]
    fn recursive_bbox_follows_transforms() {
        let mut layout = Layout::new(0.001);
        let child = layout.add_cell("child");
        let top = layout.add_cell("top");
        let layer = layout.alloc_layer();
        layout.insert_shape(child, layer, Rect::from_sides(0, 0, 10, 20));
        layout.add_instance(
            top,
            Instance::new(
                child,
                "c1",
                Transformation::from_parts(Point::new(100, 0), Rotation::R90, false),
            ),
        );
        assert_eq!(layout.cell_bbox(child), Some(Rect::from_sides(0, 0, 10, 20)));
        assert_eq!(
            layout.cell_bbox(top),
            Some(Rect::from_sides(80, 0, 100, 10))
        );
    }

    #[test]
    fn original_layer_import_is_idempotent() {
        let mut layout = Layout::new(0.001);
        let a = layout.import_original_layer(7);
        let b = layout.import_original_layer(7);
        assert_eq!(a, b);
        assert_eq!(layout.original_layer(7), Some(a));
        assert_eq!(layout.original_layer(8), None);
    }
}
