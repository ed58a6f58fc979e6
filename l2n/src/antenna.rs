//! Antenna (charge accumulation) checks over the cluster tree.

use arcstr::ArcStr;
use geometry::{Shape, Transformation};

use crate::clusters::ClusterId;
use crate::layout::{CellId, LayerId};
use crate::netlist::LayoutToNetlist;

/// One antenna rule violation.
#[derive(Clone, Debug)]
pub struct AntennaViolation {
    /// The cell owning the violating cluster.
    pub cell: CellId,
    /// The violating cluster.
    pub cluster: ClusterId,
    /// The computed collector-to-gate ratio.
    pub ratio: f64,
    /// The effective limit, including diode relief.
    pub limit: f64,
    /// The collector-layer shapes of the cluster, for marker output.
    pub shapes: Vec<Shape>,
    /// A human-readable explanation.
    pub text: ArcStr,
}

impl LayoutToNetlist {
    /// Runs an antenna check over every root cluster.
    ///
    /// Per cluster, the gate quantity is `gate_area_factor * area +
    /// gate_perimeter_factor * perimeter` summed over `gate`-layer shapes,
    /// and likewise for the collector (`metal`) layer. Clusters with a zero
    /// gate quantity are skipped. Each `(layer, v)` diode entry with `v >
    /// 0` raises the limit by `diode area / v`; a diode entry with `v ==
    /// 0` grants full relief as soon as one diode shape is present.
    ///
    /// # Panics
    ///
    /// Panics if no netlist has been extracted.
    #[allow(clippy::too_many_arguments)]
    pub fn antenna_check(
        &self,
        gate: LayerId,
        gate_area_factor: f64,
        gate_perimeter_factor: f64,
        metal: LayerId,
        metal_area_factor: f64,
        metal_perimeter_factor: f64,
        ratio_limit: f64,
        diodes: &[(LayerId, f64)],
    ) -> Vec<AntennaViolation> {
        assert!(
            self.is_netlist_extracted(),
            "antenna checks require an extracted netlist"
        );
        let clusters = self.clusters().expect("no cluster tree available");
        let store = self.dss().expect("no shape store available");
        let layout = store.read().unwrap();

        let mut violations = Vec::new();
        for (cell, cluster_id) in clusters.root_clusters() {
            let mut gate_quantity = 0.0;
            let mut metal_quantity = 0.0;
            let mut metal_shapes = Vec::new();
            let mut diode_area = vec![0.0f64; diodes.len()];
            let mut diode_count = vec![0usize; diodes.len()];
            clusters.for_each_shape(
                &layout,
                cell,
                cluster_id,
                Transformation::identity(),
                &mut |layer, shape| {
                    if layer == gate {
                        gate_quantity += gate_area_factor * shape.area()
                            + gate_perimeter_factor * shape.perimeter();
                    }
                    if layer == metal {
                        metal_quantity += metal_area_factor * shape.area()
                            + metal_perimeter_factor * shape.perimeter();
                        metal_shapes.push(shape.clone());
                    }
                    for (i, (diode_layer, _)) in diodes.iter().enumerate() {
                        if layer == *diode_layer {
                            diode_area[i] += shape.area();
                            diode_count[i] += 1;
                        }
                    }
                },
            );
            if gate_quantity == 0.0 {
                continue;
            }
            // A zero-divisor diode entry grants full relief when present.
            if diodes
                .iter()
                .enumerate()
                .any(|(i, (_, v))| *v == 0.0 && diode_count[i] > 0)
            {
                continue;
            }
            let mut limit = ratio_limit;
            for (i, (_, v)) in diodes.iter().enumerate() {
                if *v > 0.0 {
                    limit += diode_area[i] / v;
                }
            }
            let ratio = metal_quantity / gate_quantity;
            if ratio > limit {
                violations.push(AntennaViolation {
                    cell,
                    cluster: cluster_id,
                    ratio,
                    limit,
                    shapes: metal_shapes,
                    text: arcstr::format!(
                        "antenna ratio {ratio:.3} exceeds limit {limit:.3}"
                    ),
                });
            }
        }
        violations
    }
}
