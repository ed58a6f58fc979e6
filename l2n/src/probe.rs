//! Point probing: finding the net under a point.

use arcstr::ArcStr;
use geometry::{Point, Transformation};
use netir::{CircuitId, ClusterRef, NetId};

use crate::clusters::HierClusters;
use crate::layout::{CellId, LayerId, Layout};
use crate::netlist::LayoutToNetlist;

/// The outcome of a successful probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResult {
    /// The circuit owning the net.
    pub circuit: CircuitId,
    /// The probed net.
    pub net: NetId,
    /// The instance path from the top cell down to the owning circuit.
    pub path: Vec<ArcStr>,
}

impl LayoutToNetlist {
    /// Finds the net whose geometry on `layer` covers `point` (given in
    /// database units, in top-cell coordinates).
    ///
    /// The walk starts at the top cell and descends into instances whose
    /// bounding box covers the transformed point, so the result is the
    /// topmost net covering the point. A miss returns `None`.
    ///
    /// # Panics
    ///
    /// Panics if no netlist has been extracted.
    pub fn probe_net(&self, layer: LayerId, point: Point) -> Option<ProbeResult> {
        assert!(
            self.is_netlist_extracted(),
            "probing requires an extracted netlist"
        );
        let clusters = self.clusters()?;
        let store = self.dss().ok()?;
        let layout = store.read().unwrap();
        let top = layout.top_cell()?;
        let mut path = Vec::new();
        self.probe_in_cell(&layout, clusters, top, layer, point, &mut path)
    }

    /// Like [`probe_net`](Self::probe_net), with the point given in µm.
    pub fn probe_net_um(&self, layer: LayerId, point: (f64, f64)) -> Option<ProbeResult> {
        let dbu = {
            let store = self.dss().ok()?;
            let dbu = store.read().unwrap().dbu();
            dbu
        };
        self.probe_net(
            layer,
            Point::new(
                (point.0 / dbu).round() as i64,
                (point.1 / dbu).round() as i64,
            ),
        )
    }

    fn probe_in_cell(
        &self,
        layout: &Layout,
        clusters: &HierClusters,
        cell: CellId,
        layer: LayerId,
        point: Point,
        path: &mut Vec<ArcStr>,
    ) -> Option<ProbeResult> {
        if let Some(cc) = clusters.cell(cell) {
            for (cluster_id, cluster) in cc.clusters() {
                if !cluster.bbox().is_some_and(|b| b.contains_point(point)) {
                    continue;
                }
                let mut hit = false;
                clusters.for_each_shape(
                    layout,
                    cell,
                    cluster_id,
                    Transformation::identity(),
                    &mut |l, shape| {
                        if !hit && l == layer && shape.contains_point(point) {
                            hit = true;
                        }
                    },
                );
                if !hit {
                    continue;
                }
                let circuit_id = self.circuit_of_cell(cell)?;
                let target = ClusterRef {
                    cell: cell.raw(),
                    cluster: cluster_id.raw(),
                };
                let netlist = self.netlist()?;
                let net = netlist
                    .circuit(circuit_id)
                    .nets()
                    .find(|(_, n)| n.clusters().contains(&target))
                    .map(|(id, _)| id)?;
                return Some(ProbeResult {
                    circuit: circuit_id,
                    net,
                    path: path.clone(),
                });
            }
        }
        // No cluster covers the point here; descend into instances whose
        // recursive bounding box does.
        for inst in layout.cell(cell).instances() {
            let Some(bbox) = layout.cell_bbox(inst.child()) else {
                continue;
            };
            let t = inst.transformation();
            let local = t.inverse().apply(point);
            if !bbox.contains_point(local) {
                continue;
            }
            path.push(inst.name().clone());
            if let Some(result) =
                self.probe_in_cell(layout, clusters, inst.child(), layer, local, path)
            {
                return Some(result);
            }
            path.pop();
        }
        None
    }
}
