//! Building net geometry back into a layout.
//!
//! [`NetBuilder`] materializes extracted nets as shapes in a caller-owned
//! target [`Layout`]: flat, as per-net cells, or mirroring the circuit
//! hierarchy with reusable net subcells. Shapes optionally carry the net
//! name as a user property.

use std::collections::HashMap;

use arcstr::ArcStr;
use netir::{CircuitId, DeviceId, NetId};

use crate::clusters::ClusterId;
use crate::error::Result;
use crate::layout::{CellId, Instance, LayerId, Layout};
use crate::netlist::LayoutToNetlist;
use geometry::Transformation;

/// How built nets relate to the cell hierarchy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BuildNetHierarchy {
    /// Each net goes into its own cell, flat, instantiated in the target
    /// cell.
    Disconnected,
    /// Nets follow the circuit hierarchy: child-cell cluster parts go into
    /// reusable subcells instantiated with the original placement.
    #[default]
    SubcircuitCells,
    /// All net shapes are flattened into the target cell.
    Flatten,
}

/// Configuration for a [`NetBuilder`].
#[derive(Clone, Debug)]
pub struct NetBuilderConfig {
    /// The hierarchy mode.
    pub hierarchy: BuildNetHierarchy,
    /// Prefix for generated net subcell names.
    pub net_cell_prefix: ArcStr,
    /// Prefix for generated device subcell names.
    pub device_cell_prefix: ArcStr,
    /// When set, every built shape carries a `(key, net name)` property.
    pub net_prop_key: Option<ArcStr>,
}

impl Default for NetBuilderConfig {
    fn default() -> Self {
        Self {
            hierarchy: BuildNetHierarchy::default(),
            net_cell_prefix: arcstr::literal!("NET_"),
            device_cell_prefix: arcstr::literal!("DEVICE_"),
            net_prop_key: None,
        }
    }
}

/// Materializes extracted nets into a target layout.
///
/// Circuits without an entry in the circuit-to-cell map are silently
/// skipped. The subcell caches live for the builder's lifetime, so
/// building many nets through one builder reuses generated cells.
pub struct NetBuilder<'a> {
    l2n: &'a LayoutToNetlist,
    target: &'a mut Layout,
    /// Circuit -> target cell receiving that circuit's nets.
    cmap: &'a HashMap<CircuitId, CellId>,
    /// Source layer -> target layer.
    lmap: &'a HashMap<LayerId, LayerId>,
    config: NetBuilderConfig,
    /// (source cell, net-name property value, cluster) -> generated subcell.
    cell_cache: HashMap<(CellId, Option<ArcStr>, ClusterId), CellId>,
    device_cache: HashMap<(CircuitId, DeviceId), CellId>,
}

impl<'a> NetBuilder<'a> {
    /// Creates a builder against the given extraction result.
    ///
    /// # Panics
    ///
    /// Panics if no netlist has been extracted.
    pub fn new(
        l2n: &'a LayoutToNetlist,
        target: &'a mut Layout,
        cmap: &'a HashMap<CircuitId, CellId>,
        lmap: &'a HashMap<LayerId, LayerId>,
        config: NetBuilderConfig,
    ) -> Self {
        assert!(
            l2n.is_netlist_extracted(),
            "net building requires an extracted netlist"
        );
        Self {
            l2n,
            target,
            cmap,
            lmap,
            config,
            cell_cache: HashMap::new(),
            device_cache: HashMap::new(),
        }
    }

    /// Builds the geometry of one net.
    pub fn build_net(&mut self, circuit: CircuitId, net: NetId) -> Result<()> {
        let Some(&target_cell) = self.cmap.get(&circuit) else {
            return Ok(());
        };
        let store = self.l2n.dss()?;
        let source = store.read().unwrap();
        let netlist = self.l2n.netlist().expect("no netlist available");
        let net_name = netlist.circuit(circuit).net_display_name(net);
        let prop = self
            .config
            .net_prop_key
            .clone()
            .map(|key| (key, net_name.clone()));

        match self.config.hierarchy {
            BuildNetHierarchy::Flatten => {
                self.fill_flat(&source, circuit, net, target_cell, prop.as_ref());
                self.build_device_shapes(circuit, net, target_cell, true, prop.as_ref());
            }
            BuildNetHierarchy::Disconnected => {
                let name = unique_cell_name(
                    self.target,
                    format!("{}{}", self.config.net_cell_prefix, net_name),
                );
                let net_cell = self.target.add_cell(name);
                self.target.add_instance(
                    target_cell,
                    Instance::new(net_cell, net_name.clone(), Transformation::identity()),
                );
                self.fill_flat(&source, circuit, net, net_cell, prop.as_ref());
                self.build_device_shapes(circuit, net, net_cell, false, prop.as_ref());
            }
            BuildNetHierarchy::SubcircuitCells => {
                let prop_value = prop.as_ref().map(|(_, v)| v.clone());
                for cluster_ref in netlist.circuit(circuit).net(net).clusters() {
                    self.fill_cluster(
                        &source,
                        CellId::from_raw(cluster_ref.cell),
                        ClusterId::from_raw(cluster_ref.cluster),
                        target_cell,
                        prop.as_ref(),
                        &prop_value,
                    );
                }
                self.build_device_shapes(circuit, net, target_cell, false, prop.as_ref());
            }
        }
        Ok(())
    }

    /// Builds the given nets of one circuit.
    pub fn build_nets(&mut self, circuit: CircuitId, nets: &[NetId]) -> Result<()> {
        for &net in nets {
            self.build_net(circuit, net)?;
        }
        Ok(())
    }

    /// Builds every net of every mapped circuit.
    pub fn build_all_nets(&mut self) -> Result<()> {
        let netlist = self.l2n.netlist().expect("no netlist available");
        let work: Vec<(CircuitId, Vec<NetId>)> = netlist
            .circuits()
            .filter(|(id, _)| self.cmap.contains_key(id))
            .map(|(id, c)| (id, c.nets().map(|(net, _)| net).collect()))
            .collect();
        for (circuit, nets) in work {
            self.build_nets(circuit, &nets)?;
        }
        Ok(())
    }

    /// Inserts the full recursive shape set of a net into one target cell.
    fn fill_flat(
        &mut self,
        source: &Layout,
        circuit: CircuitId,
        net: NetId,
        target_cell: CellId,
        prop: Option<&(ArcStr, ArcStr)>,
    ) {
        let netlist = self.l2n.netlist().expect("no netlist available");
        let clusters = self.l2n.clusters().expect("no cluster tree available");
        let target = &mut *self.target;
        let lmap = self.lmap;
        for cluster_ref in netlist.circuit(circuit).net(net).clusters() {
            clusters.for_each_shape(
                source,
                CellId::from_raw(cluster_ref.cell),
                ClusterId::from_raw(cluster_ref.cluster),
                Transformation::identity(),
                &mut |layer, shape| {
                    if let Some(&target_layer) = lmap.get(&layer) {
                        match prop {
                            Some(p) => target.insert_shape_with_property(
                                target_cell,
                                target_layer,
                                shape,
                                p.clone(),
                            ),
                            None => target.insert_shape(target_cell, target_layer, shape),
                        }
                    }
                },
            );
        }
    }

    /// Inserts the local shapes of a cluster and instantiates reusable
    /// subcells for its child clusters.
    fn fill_cluster(
        &mut self,
        source: &Layout,
        cell: CellId,
        cluster: ClusterId,
        target_cell: CellId,
        prop: Option<&(ArcStr, ArcStr)>,
        prop_value: &Option<ArcStr>,
    ) {
        let clusters = self.l2n.clusters().expect("no cluster tree available");
        let cc = clusters.cell(cell).expect("cell has no clusters");
        let lc = cc.cluster(cluster);
        for layer in lc.layers() {
            let Some(&target_layer) = self.lmap.get(&layer) else {
                continue;
            };
            for shape in lc.shapes_on(layer) {
                match prop {
                    Some(p) => self.target.insert_shape_with_property(
                        target_cell,
                        target_layer,
                        shape.clone(),
                        p.clone(),
                    ),
                    None => self
                        .target
                        .insert_shape(target_cell, target_layer, shape.clone()),
                }
            }
        }
        for conn in cc.connections() {
            if conn.parent != cluster {
                continue;
            }
            let inst = &source.cell(cell).instances()[conn.instance];
            let subcell =
                self.net_subcell(source, inst.child(), conn.child, prop, prop_value);
            self.target.add_instance(
                target_cell,
                Instance::new(subcell, inst.name().clone(), inst.transformation()),
            );
        }
    }

    /// The reusable subcell holding a child-cell cluster, created on first
    /// use.
    fn net_subcell(
        &mut self,
        source: &Layout,
        cell: CellId,
        cluster: ClusterId,
        prop: Option<&(ArcStr, ArcStr)>,
        prop_value: &Option<ArcStr>,
    ) -> CellId {
        let key = (cell, prop_value.clone(), cluster);
        if let Some(&cached) = self.cell_cache.get(&key) {
            return cached;
        }
        let name = unique_cell_name(
            self.target,
            format!(
                "{}{}_{}",
                self.config.net_cell_prefix,
                source.cell(cell).name(),
                cluster.raw()
            ),
        );
        let subcell = self.target.add_cell(name);
        self.cell_cache.insert(key, subcell);
        self.fill_cluster(source, cell, cluster, subcell, prop, prop_value);
        subcell
    }

    /// Materializes the footprints of the devices attached to a net.
    fn build_device_shapes(
        &mut self,
        circuit: CircuitId,
        net: NetId,
        target_cell: CellId,
        flatten: bool,
        prop: Option<&(ArcStr, ArcStr)>,
    ) {
        let netlist = self.l2n.netlist().expect("no netlist available");
        let devices: Vec<DeviceId> = netlist
            .circuit(circuit)
            .devices()
            .filter(|(_, d)| d.terminals().any(|(_, n)| n == net))
            .map(|(id, _)| id)
            .collect();
        for device_id in devices {
            if flatten {
                self.insert_device_abstracts(circuit, device_id, target_cell, prop);
                continue;
            }
            let subcell = match self.device_cache.get(&(circuit, device_id)) {
                Some(&cached) => cached,
                None => {
                    let name = unique_cell_name(
                        self.target,
                        format!(
                            "{}{}",
                            self.config.device_cell_prefix,
                            netlist.circuit(circuit).device(device_id).name()
                        ),
                    );
                    let subcell = self.target.add_cell(name);
                    self.device_cache.insert((circuit, device_id), subcell);
                    self.insert_device_abstracts(circuit, device_id, subcell, None);
                    subcell
                }
            };
            self.target.add_instance(
                target_cell,
                Instance::new(
                    subcell,
                    netlist.circuit(circuit).device(device_id).name().clone(),
                    Transformation::identity(),
                ),
            );
        }
    }

    fn insert_device_abstracts(
        &mut self,
        circuit: CircuitId,
        device: DeviceId,
        target_cell: CellId,
        prop: Option<&(ArcStr, ArcStr)>,
    ) {
        let netlist = self.l2n.netlist().expect("no netlist available");
        for abs in netlist.circuit(circuit).device(device).abstracts() {
            let Some(&target_layer) = self.lmap.get(&LayerId::from_raw(abs.layer)) else {
                continue;
            };
            match prop {
                Some(p) => self.target.insert_shape_with_property(
                    target_cell,
                    target_layer,
                    abs.shape.clone(),
                    p.clone(),
                ),
                None => self
                    .target
                    .insert_shape(target_cell, target_layer, abs.shape.clone()),
            }
        }
    }
}

/// Picks a cell name not yet used in the target, appending `$<n>` on
/// collision.
fn unique_cell_name(target: &Layout, base: String) -> ArcStr {
    if target.try_cell_id_named(&base).is_none() {
        return base.into();
    }
    let mut i = 1;
    loop {
        let candidate = format!("{base}${i}");
        if target.try_cell_id_named(&candidate).is_none() {
            return candidate.into();
        }
        i += 1;
    }
}
