//! The hierarchical cluster engine.
//!
//! Clustering happens in two passes. The local pass groups the shapes of
//! each cell into connected clusters, independently per cell (and in
//! parallel across cells). The hierarchical pass then walks the hierarchy
//! bottom-up and, per parent cell, merges parent clusters with the child
//! clusters they touch across instance boundaries, recording a
//! [`ClusterConnection`] per constituent. A merge with no participating
//! parent shapes produces a virtual, shape-less parent cluster.
//!
//! Global nets always propagate upward: a child cluster carrying a global
//! net joins the parent cluster carrying the same global, creating one if
//! necessary.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

use arcstr::ArcStr;
use geometry::{Bbox, Rect, Shape, Transformation};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::connectivity::{Connectivity, GlobalNetId};
use crate::layout::{CellId, LayerId, Layout};

/// An opaque cluster identifier, scoped to one cell.
///
/// Ids are dense, nonzero, and assigned in creation order.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ClusterId(u32);

impl ClusterId {
    /// The raw id value, for cross-crate references.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Reconstructs a cluster id from its raw value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cluster{}", self.0)
    }
}

/// One cluster of electrically connected shapes within a cell.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LocalCluster {
    shapes: BTreeMap<LayerId, Vec<Shape>>,
    globals: BTreeSet<GlobalNetId>,
    labels: Vec<ArcStr>,
    /// Recursive bounding box, covering connected child clusters.
    bbox: Option<Rect>,
}

impl LocalCluster {
    fn insert_shape(&mut self, layer: LayerId, shape: Shape) {
        if let Some(b) = shape.bbox() {
            self.bbox = Some(match self.bbox {
                Some(cur) => cur.union(b),
                None => b,
            });
        }
        self.shapes.entry(layer).or_default().push(shape);
    }

    fn add_label(&mut self, label: ArcStr) {
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// The shapes of this cluster on the given layer (local only).
    pub fn shapes_on(&self, layer: LayerId) -> &[Shape] {
        self.shapes.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The layers this cluster has local shapes on, in handle order.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.shapes.keys().copied()
    }

    /// The global nets this cluster is linked to.
    pub fn globals(&self) -> impl Iterator<Item = GlobalNetId> + '_ {
        self.globals.iter().copied()
    }

    /// The text labels attached to this cluster, in attachment order.
    pub fn labels(&self) -> &[ArcStr] {
        &self.labels
    }

    /// The recursive bounding box of this cluster.
    pub fn bbox(&self) -> Option<Rect> {
        self.bbox
    }
}

/// Records that a parent cluster contains a child-cell cluster through the
/// given instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClusterConnection {
    /// The parent-cell cluster.
    pub parent: ClusterId,
    /// The index of the instance in the parent cell's instance list.
    pub instance: usize,
    /// The cluster within the instantiated cell.
    pub child: ClusterId,
}

/// The clusters of one cell.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellClusters {
    cluster_id: u32,
    clusters: IndexMap<ClusterId, LocalCluster>,
    connections: Vec<ClusterConnection>,
}

impl CellClusters {
    fn add_cluster(&mut self, cluster: LocalCluster) -> ClusterId {
        self.cluster_id += 1;
        let id = ClusterId(self.cluster_id);
        self.clusters.insert(id, cluster);
        id
    }

    /// Gets the cluster with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no cluster with the given ID exists.
    pub fn cluster(&self, id: ClusterId) -> &LocalCluster {
        self.try_cluster(id).expect("no cluster with the given id")
    }

    /// Gets the cluster with the given ID.
    pub fn try_cluster(&self, id: ClusterId) -> Option<&LocalCluster> {
        self.clusters.get(&id)
    }

    fn cluster_mut(&mut self, id: ClusterId) -> &mut LocalCluster {
        self.clusters
            .get_mut(&id)
            .expect("no cluster with the given id")
    }

    /// Iterates over the `(id, cluster)` pairs of this cell, in creation
    /// order.
    pub fn clusters(&self) -> impl Iterator<Item = (ClusterId, &LocalCluster)> {
        self.clusters.iter().map(|(id, c)| (*id, c))
    }

    /// The ids of all clusters of this cell, in creation order.
    pub fn ids(&self) -> Vec<ClusterId> {
        self.clusters.keys().copied().collect()
    }

    /// The number of clusters in this cell.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Returns `true` if this cell has no clusters.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// The recorded parent-to-child cluster connections.
    pub fn connections(&self) -> &[ClusterConnection] {
        &self.connections
    }

    /// Merges `other` into `survivor` and deletes `other`, remapping
    /// connections.
    fn merge(&mut self, survivor: ClusterId, other: ClusterId) {
        debug_assert_ne!(survivor, other);
        let removed = self
            .clusters
            .shift_remove(&other)
            .expect("no cluster with the given id");
        let kept = self.cluster_mut(survivor);
        for (layer, shapes) in removed.shapes {
            kept.shapes.entry(layer).or_default().extend(shapes);
        }
        kept.globals.extend(removed.globals);
        for label in removed.labels {
            kept.add_label(label);
        }
        if let Some(b) = removed.bbox {
            kept.bbox = Some(match kept.bbox {
                Some(cur) => cur.union(b),
                None => b,
            });
        }
        for conn in &mut self.connections {
            if conn.parent == other {
                conn.parent = survivor;
            }
        }
    }
}

/// The cluster tree of a whole layout: per-cell clusters plus the
/// cross-boundary connections recorded by the hierarchical pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HierClusters {
    cells: IndexMap<CellId, CellClusters>,
    /// Cell -> clusters of that cell connected upward in any instantiation.
    upward: HashMap<CellId, BTreeSet<ClusterId>>,
}

impl HierClusters {
    /// Builds the cluster tree for the given layout under the declared
    /// connectivity.
    ///
    /// The local pass runs in parallel across cells with the given number
    /// of worker threads; the hierarchical pass is sequential and
    /// bottom-up. The result is independent of the thread count.
    pub fn build(layout: &Layout, conn: &Connectivity, threads: usize) -> Self {
        let order = match layout.top_cell() {
            Some(top) => layout.cells_under(top),
            None => layout.bottom_up(),
        };
        let locals = local_pass(layout, conn, &order, threads);
        let mut result = Self {
            cells: order.iter().copied().zip(locals).collect(),
            upward: HashMap::new(),
        };
        for &parent in &order {
            result.connect_instances(layout, conn, parent);
        }
        result
    }

    /// The clusters of the given cell, if the cell was clustered.
    pub fn cell(&self, cell: CellId) -> Option<&CellClusters> {
        self.cells.get(&cell)
    }

    /// Iterates over the `(cell, clusters)` pairs, in bottom-up cell order.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &CellClusters)> {
        self.cells.iter().map(|(id, c)| (*id, c))
    }

    /// Returns `true` if the given cluster is connected upward in any
    /// instantiation of its cell.
    pub fn is_connected_upward(&self, cell: CellId, cluster: ClusterId) -> bool {
        self.upward
            .get(&cell)
            .is_some_and(|set| set.contains(&cluster))
    }

    /// The clusters of the given cell connected upward, in id order.
    pub fn upward_clusters(&self, cell: CellId) -> impl Iterator<Item = ClusterId> + '_ {
        self.upward.get(&cell).into_iter().flatten().copied()
    }

    /// All root clusters: clusters never referenced by an upward
    /// connection, in deterministic (cell, cluster) order.
    pub fn root_clusters(&self) -> Vec<(CellId, ClusterId)> {
        let mut roots = Vec::new();
        for (cell, cc) in self.cells() {
            for (id, _) in cc.clusters() {
                if !self.is_connected_upward(cell, id) {
                    roots.push((cell, id));
                }
            }
        }
        roots
    }

    /// Invokes `f` for every shape of the hierarchical cluster rooted at
    /// `(cell, cluster)`, transformed into the coordinate frame given by
    /// `trans`.
    pub fn for_each_shape(
        &self,
        layout: &Layout,
        cell: CellId,
        cluster: ClusterId,
        trans: Transformation,
        f: &mut impl FnMut(LayerId, Shape),
    ) {
        let cc = self.cells.get(&cell).expect("cell has no clusters");
        let lc = cc.cluster(cluster);
        for (layer, shapes) in &lc.shapes {
            for shape in shapes {
                f(*layer, shape.transform(trans));
            }
        }
        for conn in &cc.connections {
            if conn.parent == cluster {
                let inst = &layout.cell(cell).instances()[conn.instance];
                self.for_each_shape(
                    layout,
                    inst.child(),
                    conn.child,
                    Transformation::cascade(inst.transformation(), trans),
                    f,
                );
            }
        }
    }

    /// The hierarchical pass for one parent cell.
    fn connect_instances(&mut self, layout: &Layout, conn: &Connectivity, parent: CellId) {
        #[derive(Copy, Clone)]
        enum Node {
            Parent(ClusterId),
            Child {
                instance: usize,
                cell: CellId,
                cluster: ClusterId,
            },
        }

        let parent_cell = layout.cell(parent);
        let mut nodes = Vec::new();
        for id in self.cells[&parent].ids() {
            nodes.push(Node::Parent(id));
        }
        for (instance, inst) in parent_cell.instances().iter().enumerate() {
            if let Some(cc) = self.cells.get(&inst.child()) {
                for cluster in cc.ids() {
                    nodes.push(Node::Child {
                        instance,
                        cell: inst.child(),
                        cluster,
                    });
                }
            }
        }
        if nodes.is_empty() {
            return;
        }

        let node_trans = |node: &Node| match node {
            Node::Parent(_) => Transformation::identity(),
            Node::Child { instance, .. } => {
                parent_cell.instances()[*instance].transformation()
            }
        };
        let node_cluster = |node: &Node| match node {
            Node::Parent(id) => self.cells[&parent].cluster(*id),
            Node::Child { cell, cluster, .. } => self.cells[cell].cluster(*cluster),
        };
        let node_bbox = |node: &Node| {
            node_cluster(node).bbox.map(|b| {
                let t = node_trans(node);
                Rect::new(t.apply(b.lower_left()), t.apply(b.upper_right()))
            })
        };

        // Global-net slots join all nodes carrying the same global.
        let mut globals: BTreeSet<GlobalNetId> = BTreeSet::new();
        for node in &nodes {
            globals.extend(node_cluster(node).globals.iter().copied());
        }
        let slot_of: HashMap<GlobalNetId, usize> = globals
            .iter()
            .enumerate()
            .map(|(i, g)| (*g, nodes.len() + i))
            .collect();

        let mut uf = UnionFind::new(nodes.len() + globals.len());
        for (i, node) in nodes.iter().enumerate() {
            for g in &node_cluster(node).globals {
                uf.union(i, slot_of[g]);
            }
        }

        // Geometric edges across the instance boundary. Parent clusters are
        // already maximal among themselves, so parent/parent pairs are
        // skipped.
        let mut shape_cache: Vec<Option<Vec<(LayerId, Shape)>>> = vec![None; nodes.len()];
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if matches!((&nodes[i], &nodes[j]), (Node::Parent(_), Node::Parent(_))) {
                    continue;
                }
                if uf.find(i) == uf.find(j) {
                    continue;
                }
                let (Some(bi), Some(bj)) = (node_bbox(&nodes[i]), node_bbox(&nodes[j])) else {
                    continue;
                };
                if !bi.touches(bj) {
                    continue;
                }
                for k in [i, j] {
                    if shape_cache[k].is_none() {
                        let mut out = Vec::new();
                        match &nodes[k] {
                            Node::Parent(id) => self.collect_shapes(
                                layout,
                                parent,
                                *id,
                                Transformation::identity(),
                                true,
                                &mut out,
                            ),
                            Node::Child { cell, cluster, .. } => self.collect_shapes(
                                layout,
                                *cell,
                                *cluster,
                                node_trans(&nodes[k]),
                                false,
                                &mut out,
                            ),
                        }
                        shape_cache[k] = Some(out);
                    }
                }
                let (a, b) = (
                    shape_cache[i].as_ref().unwrap(),
                    shape_cache[j].as_ref().unwrap(),
                );
                let touch = a.iter().any(|(la, sa)| {
                    b.iter()
                        .any(|(lb, sb)| conn.connected(*la, *lb) && sa.interacts(sb))
                });
                if touch {
                    uf.union(i, j);
                }
            }
        }

        // Group nodes and plan the merges; mutation happens afterwards so
        // child cluster data can be read while planning.
        struct Plan {
            parents: Vec<ClusterId>,
            children: Vec<(usize, CellId, ClusterId, BTreeSet<GlobalNetId>, Option<Rect>)>,
        }
        let mut plan_of_root: HashMap<usize, usize> = HashMap::new();
        let mut plans: Vec<Plan> = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            let root = uf.find(i);
            let pi = *plan_of_root.entry(root).or_insert_with(|| {
                plans.push(Plan {
                    parents: Vec::new(),
                    children: Vec::new(),
                });
                plans.len() - 1
            });
            match node {
                Node::Parent(id) => plans[pi].parents.push(*id),
                Node::Child {
                    instance,
                    cell,
                    cluster,
                } => {
                    let lc = self.cells[cell].cluster(*cluster);
                    plans[pi].children.push((
                        *instance,
                        *cell,
                        *cluster,
                        lc.globals.clone(),
                        node_bbox(node),
                    ));
                }
            }
        }

        for mut plan in plans {
            let total = plan.parents.len() + plan.children.len();
            let child_globals = plan.children.iter().any(|(_, _, _, g, _)| !g.is_empty());
            // A lone child cluster with no globals stays where it is.
            if plan.children.is_empty() || (total < 2 && !child_globals) {
                continue;
            }
            plan.parents.sort_unstable();
            let cc = self.cells.get_mut(&parent).expect("parent has no clusters");
            let survivor = match plan.parents.first() {
                Some(&first) => {
                    for &other in &plan.parents[1..] {
                        cc.merge(first, other);
                    }
                    first
                }
                // Virtual, shape-less parent cluster.
                None => cc.add_cluster(LocalCluster::default()),
            };
            for (instance, cell, cluster, globals, bbox) in plan.children {
                cc.connections.push(ClusterConnection {
                    parent: survivor,
                    instance,
                    child: cluster,
                });
                let kept = cc.cluster_mut(survivor);
                kept.globals.extend(globals);
                if let Some(b) = bbox {
                    kept.bbox = Some(match kept.bbox {
                        Some(cur) => cur.union(b),
                        None => b,
                    });
                }
                self.upward.entry(cell).or_default().insert(cluster);
            }
        }
    }

    /// Collects the recursive shape set of a cluster, transformed by
    /// `trans`. With `local_only` set, child connections are not followed.
    fn collect_shapes(
        &self,
        layout: &Layout,
        cell: CellId,
        cluster: ClusterId,
        trans: Transformation,
        local_only: bool,
        out: &mut Vec<(LayerId, Shape)>,
    ) {
        let cc = &self.cells[&cell];
        let lc = cc.cluster(cluster);
        for (layer, shapes) in &lc.shapes {
            for shape in shapes {
                out.push((*layer, shape.transform(trans)));
            }
        }
        if local_only {
            return;
        }
        for conn in &cc.connections {
            if conn.parent == cluster {
                let inst = &layout.cell(cell).instances()[conn.instance];
                self.collect_shapes(
                    layout,
                    inst.child(),
                    conn.child,
                    Transformation::cascade(inst.transformation(), trans),
                    false,
                    out,
                );
            }
        }
    }
}

/// The local clustering pass, parallel across cells.
fn local_pass(
    layout: &Layout,
    conn: &Connectivity,
    order: &[CellId],
    threads: usize,
) -> Vec<CellClusters> {
    if threads <= 1 || order.len() <= 1 {
        return order
            .iter()
            .map(|&cell| local_clusters(layout, conn, cell))
            .collect();
    }
    let chunk = order.len().div_ceil(threads);
    let mut results = Vec::with_capacity(order.len());
    std::thread::scope(|s| {
        let handles: Vec<_> = order
            .chunks(chunk)
            .map(|cells| {
                s.spawn(move || {
                    cells
                        .iter()
                        .map(|&cell| local_clusters(layout, conn, cell))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            results.extend(handle.join().expect("cluster worker panicked"));
        }
    });
    results
}

/// Clusters the shapes of one cell.
fn local_clusters(layout: &Layout, conn: &Connectivity, cell: CellId) -> CellClusters {
    let cell_data = layout.cell(cell);
    let mut items: Vec<(LayerId, &Shape)> = Vec::new();
    for layer in conn.layers() {
        for shape in cell_data.shapes_on(layer) {
            items.push((layer, &shape.geo));
        }
    }

    let mut uf = UnionFind::new(items.len());
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if uf.find(i) == uf.find(j) {
                continue;
            }
            let (la, sa) = items[i];
            let (lb, sb) = items[j];
            if conn.connected(la, lb) && sa.interacts(sb) {
                uf.union(i, j);
            }
        }
    }

    // Clusters sharing a global net merge even without touching.
    let mut anchor: HashMap<GlobalNetId, usize> = HashMap::new();
    for (i, (layer, _)) in items.iter().enumerate() {
        for g in conn.globals_of(*layer) {
            match anchor.get(&g) {
                Some(&j) => {
                    uf.union(i, j);
                }
                None => {
                    anchor.insert(g, i);
                }
            }
        }
    }

    let mut cc = CellClusters::default();
    let mut cluster_of_root: HashMap<usize, ClusterId> = HashMap::new();
    let mut cluster_of_item: Vec<ClusterId> = Vec::with_capacity(items.len());
    for (i, (layer, shape)) in items.iter().enumerate() {
        let root = uf.find(i);
        let id = *cluster_of_root
            .entry(root)
            .or_insert_with(|| cc.add_cluster(LocalCluster::default()));
        let lc = cc.cluster_mut(id);
        lc.insert_shape(*layer, (*shape).clone());
        for g in conn.globals_of(*layer) {
            lc.globals.insert(g);
        }
        cluster_of_item.push(id);
    }

    // Labels on connected text layers attach to the containing cluster.
    for text_layer in conn.layers() {
        for text in cell_data.texts_on(text_layer) {
            let hit = items.iter().enumerate().find(|(_, (layer, shape))| {
                conn.connected(*layer, text_layer) && shape.contains_point(text.at)
            });
            if let Some((i, _)) = hit {
                cc.cluster_mut(cluster_of_item[i]).add_label(text.text.clone());
            }
        }
    }

    cc
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb.max(ra)] = rb.min(ra);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Instance, Text};
    use geometry::Point;

    fn simple_conn(layer: LayerId) -> Connectivity {
        let mut conn = Connectivity::new();
        conn.connect_layer(layer);
        conn
    }

    #[test]
    fn touching_shapes_cluster_together() {
        let mut layout = Layout::new(0.001);
        let cell = layout.add_cell("top");
        layout.set_top(cell);
        let metal = layout.alloc_layer();
        layout.insert_shape(cell, metal, Rect::from_sides(0, 0, 10, 10));
        layout.insert_shape(cell, metal, Rect::from_sides(10, 0, 20, 10));
        layout.insert_shape(cell, metal, Rect::from_sides(30, 0, 40, 10));

        let clusters = HierClusters::build(&layout, &simple_conn(metal), 1);
        let cc = clusters.cell(cell).unwrap();
        assert_eq!(cc.len(), 2);
        let sizes: Vec<usize> = cc.clusters().map(|(_, c)| c.shapes_on(metal).len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn unconnected_layers_stay_apart() {
        let mut layout = Layout::new(0.001);
        let cell = layout.add_cell("top");
        layout.set_top(cell);
        let metal = layout.alloc_layer();
        let poly = layout.alloc_layer();
        layout.insert_shape(cell, metal, Rect::from_sides(0, 0, 10, 10));
        layout.insert_shape(cell, poly, Rect::from_sides(5, 5, 15, 15));

        let mut conn = Connectivity::new();
        conn.connect_layer(metal);
        conn.connect_layer(poly);
        let clusters = HierClusters::build(&layout, &conn, 1);
        assert_eq!(clusters.cell(cell).unwrap().len(), 2);

        conn.connect(metal, poly);
        let clusters = HierClusters::build(&layout, &conn, 1);
        assert_eq!(clusters.cell(cell).unwrap().len(), 1);
    }

    #[test]
    fn labels_attach_to_containing_cluster() {
        let mut layout = Layout::new(0.001);
        let cell = layout.add_cell("top");
        layout.set_top(cell);
        let metal = layout.alloc_layer();
        let labels = layout.alloc_layer();
        layout.insert_shape(cell, metal, Rect::from_sides(0, 0, 10, 10));
        layout.insert_text(cell, labels, Text::new("vout", Point::new(5, 5)));
        layout.insert_text(cell, labels, Text::new("miss", Point::new(50, 50)));

        let mut conn = Connectivity::new();
        conn.connect_layer(metal);
        conn.connect(metal, labels);
        let clusters = HierClusters::build(&layout, &conn, 1);
        let cc = clusters.cell(cell).unwrap();
        let (_, cluster) = cc.clusters().next().unwrap();
        assert_eq!(cluster.labels(), &[ArcStr::from("vout")]);
    }

    #[test]
    fn cross_boundary_touch_connects_parent_and_child() {
        let mut layout = Layout::new(0.001);
        let child = layout.add_cell("child");
        let top = layout.add_cell("top");
        let metal = layout.alloc_layer();
        layout.insert_shape(child, metal, Rect::from_sides(0, 0, 10, 10));
        layout.insert_shape(top, metal, Rect::from_sides(10, 0, 30, 10));
        layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
        layout.set_top(top);

        let clusters = HierClusters::build(&layout, &simple_conn(metal), 1);
        let top_cc = clusters.cell(top).unwrap();
        assert_eq!(top_cc.len(), 1);
        assert_eq!(top_cc.connections().len(), 1);
        let child_id = top_cc.connections()[0].child;
        assert!(clusters.is_connected_upward(child, child_id));

        let mut count = 0;
        clusters.for_each_shape(
            &layout,
            top,
            top_cc.ids()[0],
            Transformation::identity(),
            &mut |_, _| count += 1,
        );
        assert_eq!(count, 2);
    }

    #[test]
    fn sibling_instances_connect_through_a_virtual_cluster() {
        let mut layout = Layout::new(0.001);
        let child = layout.add_cell("child");
        let top = layout.add_cell("top");
        let metal = layout.alloc_layer();
        layout.insert_shape(child, metal, Rect::from_sides(0, 0, 10, 10));
        layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
        layout.add_instance(
            top,
            Instance::new(child, "c2", Transformation::translate(Point::new(10, 0))),
        );
        layout.set_top(top);

        let clusters = HierClusters::build(&layout, &simple_conn(metal), 1);
        let top_cc = clusters.cell(top).unwrap();
        // One virtual parent cluster joining the two child clusters.
        assert_eq!(top_cc.len(), 1);
        let (id, cluster) = top_cc.clusters().next().unwrap();
        assert!(cluster.shapes_on(metal).is_empty());
        assert_eq!(top_cc.connections().len(), 2);
        assert!(top_cc.connections().iter().all(|c| c.parent == id));
    }

    #[test]
    fn globals_propagate_upward() {
        let mut layout = Layout::new(0.001);
        let child = layout.add_cell("child");
        let top = layout.add_cell("top");
        let well = layout.alloc_layer();
        layout.insert_shape(child, well, Rect::from_sides(0, 0, 10, 10));
        layout.insert_shape(top, well, Rect::from_sides(1000, 0, 1010, 10));
        layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
        layout.set_top(top);

        let mut conn = Connectivity::new();
        let g = conn.connect_global(well, "bulk").unwrap();
        let clusters = HierClusters::build(&layout, &conn, 1);
        let top_cc = clusters.cell(top).unwrap();
        // The distant parent shape and the child shape share the global.
        assert_eq!(top_cc.len(), 1);
        let (_, cluster) = top_cc.clusters().next().unwrap();
        assert_eq!(cluster.globals().collect::<Vec<_>>(), vec![g]);
        assert_eq!(top_cc.connections().len(), 1);
    }

    #[test]
    fn thread_count_does_not_change_the_result() {
        let mut layout = Layout::new(0.001);
        let child = layout.add_cell("child");
        let top = layout.add_cell("top");
        let metal = layout.alloc_layer();
        layout.insert_shape(child, metal, Rect::from_sides(0, 0, 10, 10));
        layout.insert_shape(top, metal, Rect::from_sides(10, 0, 30, 10));
        layout.insert_shape(top, metal, Rect::from_sides(100, 100, 110, 110));
        layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
        layout.set_top(top);

        let conn = simple_conn(metal);
        let one = HierClusters::build(&layout, &conn, 1);
        let four = HierClusters::build(&layout, &conn, 4);
        assert_eq!(one, four);
    }
}
