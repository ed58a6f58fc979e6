//! The extraction engine: layer preparation, device extraction, netlist
//! assembly, and the extraction state machine.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use arcstr::ArcStr;
use diagnostics::{Diagnostic, Journal, LogSink};
use geometry::{Shape, Transformation};
use indexmap::IndexMap;
use netir::{Circuit, CircuitId, ClusterRef, Device, Net, NetId, Netlist, Pin, PinId, SubCircuit};
use serde::{Deserialize, Serialize};

use crate::clusters::{ClusterId, HierClusters};
use crate::connectivity::{Connectivity, GlobalNetId};
use crate::devices::{DeviceCellView, DeviceExtractor, RawTerminal};
use crate::error::{Error, Result};
use crate::layers::{LayerContent, LayerInfo, LayerOrigin, LayerRegistry};
use crate::layout::{CellId, LayerId, Layout};
use crate::log::LogEntry;
use crate::pattern::GlobPattern;

/// The phase the engine is in.
///
/// The phases are ordered; operations move the state forward, and
/// connectivity changes after extraction move it back (invalidating the
/// extracted netlist but keeping extracted devices).
#[derive(
    Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub enum ExtractionState {
    /// Nothing prepared yet.
    #[default]
    Initial,
    /// At least one layer has been prepared.
    LayersPrepared,
    /// Devices have been extracted.
    DevicesExtracted,
    /// Connectivity has been declared.
    ConnectivityDeclared,
    /// A netlist has been extracted and is current.
    NetlistExtracted,
}

/// How the engine holds the hierarchical shape store.
#[derive(Clone, Debug, Default)]
pub(crate) enum Dss {
    /// No store attached (only reachable through deserialization of a
    /// database saved without a layout snapshot).
    #[default]
    None,
    /// A store owned by the embedder; dropped there, it is gone here too.
    Borrowed(Weak<RwLock<Layout>>),
    /// A store owned (or co-owned) by the engine.
    Owned(Arc<RwLock<Layout>>),
}

/// A rule joining same-circuit nets by name after extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetJoinRule {
    /// Joins all top-circuit nets whose name matches the pattern.
    Glob(GlobPattern),
    /// Joins all top-circuit nets whose name is in the set.
    NameSet(Vec<ArcStr>),
    /// Joins matching nets in every circuit whose name matches `cell`.
    CellGlob {
        /// The circuit name pattern.
        cell: GlobPattern,
        /// The net name pattern.
        net: GlobPattern,
    },
    /// Joins listed nets in every circuit whose name matches `cell`.
    CellNameSet {
        /// The circuit name pattern.
        cell: GlobPattern,
        /// The net names to join.
        nets: Vec<ArcStr>,
    },
}

/// The layout-to-netlist extraction engine.
///
/// The intended call sequence is: prepare layers, extract devices, declare
/// connectivity, then [`extract_netlist`](Self::extract_netlist). Queries
/// that only make sense on an extracted netlist panic when called early;
/// configuration errors are returned as [`Error`]s.
pub struct LayoutToNetlist {
    pub(crate) name: ArcStr,
    pub(crate) description: ArcStr,
    pub(crate) generator: ArcStr,
    pub(crate) dss: Dss,
    pub(crate) registry: LayerRegistry,
    pub(crate) conn: Connectivity,
    pub(crate) clusters: Option<HierClusters>,
    pub(crate) netlist: Option<Netlist>,
    pub(crate) circuit_of_cell: HashMap<CellId, CircuitId>,
    /// Terminal geometry per cell, bound to nets at extraction time.
    pub(crate) pending_terminals: HashMap<CellId, Vec<(netir::DeviceId, Vec<RawTerminal>)>>,
    pub(crate) log: Journal<LogEntry>,
    pub(crate) join_rules: Vec<NetJoinRule>,
    pub(crate) include_floating_subcircuits: bool,
    pub(crate) threads: usize,
    pub(crate) area_ratio: f64,
    pub(crate) max_vertex_count: usize,
    pub(crate) state: ExtractionState,
}

impl LayoutToNetlist {
    /// Creates an engine owning the given shape store.
    pub fn new(layout: Layout) -> Self {
        Self::from_dss(Dss::Owned(Arc::new(RwLock::new(layout))))
    }

    /// Creates an engine borrowing an externally owned shape store.
    ///
    /// The engine keeps a weak reference: if the embedder drops the store,
    /// operations fail with [`Error::NoShapeStore`]. Call
    /// [`keep_dss`](Self::keep_dss) to take shared ownership instead.
    pub fn with_external_dss(store: &Arc<RwLock<Layout>>) -> Self {
        Self::from_dss(Dss::Borrowed(Arc::downgrade(store)))
    }

    pub(crate) fn from_dss(dss: Dss) -> Self {
        Self {
            name: arcstr::literal!(""),
            description: arcstr::literal!(""),
            generator: arcstr::literal!(""),
            dss,
            registry: LayerRegistry::new(),
            conn: Connectivity::new(),
            clusters: None,
            netlist: None,
            circuit_of_cell: HashMap::new(),
            pending_terminals: HashMap::new(),
            log: Journal::new(),
            join_rules: Vec::new(),
            include_floating_subcircuits: false,
            threads: 1,
            area_ratio: 3.0,
            max_vertex_count: 16,
            state: ExtractionState::Initial,
        }
    }

    /// Upgrades a borrowed shape store to shared ownership, so it survives
    /// the embedder dropping its handle.
    pub fn keep_dss(&mut self) {
        if let Dss::Borrowed(weak) = &self.dss {
            if let Some(store) = weak.upgrade() {
                self.dss = Dss::Owned(store);
            }
        }
    }

    /// The shape store.
    pub fn dss(&self) -> Result<Arc<RwLock<Layout>>> {
        match &self.dss {
            Dss::None => Err(Error::NoShapeStore),
            Dss::Borrowed(weak) => weak.upgrade().ok_or(Error::NoShapeStore),
            Dss::Owned(store) => Ok(store.clone()),
        }
    }

    /// The database name.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Sets the database name.
    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    /// The database description.
    pub fn description(&self) -> &ArcStr {
        &self.description
    }

    /// Sets the database description.
    pub fn set_description(&mut self, description: impl Into<ArcStr>) {
        self.description = description.into();
    }

    /// The name of the tool/script that produced this database.
    pub fn generator(&self) -> &ArcStr {
        &self.generator
    }

    /// Sets the generator string.
    pub fn set_generator(&mut self, generator: impl Into<ArcStr>) {
        self.generator = generator.into();
    }

    /// The current phase of the engine.
    pub fn state(&self) -> ExtractionState {
        self.state
    }

    /// Returns `true` if a current extracted netlist is available.
    pub fn is_netlist_extracted(&self) -> bool {
        self.state == ExtractionState::NetlistExtracted
    }

    // --- configuration -----------------------------------------------------

    /// Sets the number of worker threads for the local clustering pass.
    pub fn set_threads(&mut self, threads: usize) -> Result<()> {
        if threads == 0 {
            return Err(Error::Config("thread count must be at least 1".to_string()));
        }
        self.threads = threads;
        Ok(())
    }

    /// The number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Sets the bounding-box area ratio above which an external polygon
    /// kernel is advised to split polygons.
    pub fn set_area_ratio(&mut self, area_ratio: f64) -> Result<()> {
        if !area_ratio.is_finite() || area_ratio <= 0.0 {
            return Err(Error::Config(format!(
                "area ratio must be finite and positive, got {area_ratio}"
            )));
        }
        self.area_ratio = area_ratio;
        Ok(())
    }

    /// The configured area ratio.
    pub fn area_ratio(&self) -> f64 {
        self.area_ratio
    }

    /// Sets the vertex count above which an external polygon kernel is
    /// advised to split polygons. Zero disables the advice.
    pub fn set_max_vertex_count(&mut self, max_vertex_count: usize) -> Result<()> {
        if max_vertex_count != 0 && max_vertex_count < 4 {
            return Err(Error::Config(format!(
                "max vertex count must be 0 or at least 4, got {max_vertex_count}"
            )));
        }
        self.max_vertex_count = max_vertex_count;
        Ok(())
    }

    /// The configured maximum vertex count.
    pub fn max_vertex_count(&self) -> usize {
        self.max_vertex_count
    }

    /// Keeps subcircuit instances with zero bound pins in the extracted
    /// netlist (they are dropped by default).
    pub fn set_include_floating_subcircuits(&mut self, include: bool) {
        self.include_floating_subcircuits = include;
    }

    /// Whether floating subcircuit instances are kept.
    pub fn include_floating_subcircuits(&self) -> bool {
        self.include_floating_subcircuits
    }

    // --- layer preparation -------------------------------------------------

    /// Creates a fresh, empty derived layer.
    ///
    /// Naming the layer persists it on save.
    pub fn make_layer(&mut self, name: Option<&str>) -> Result<LayerId> {
        let store = self.dss()?;
        let layer = store.write().unwrap().alloc_layer();
        self.register_info(layer, LayerOrigin::Derived, name, LayerContent::Everything)?;
        self.state = self.state.max(ExtractionState::LayersPrepared);
        Ok(layer)
    }

    /// Materializes the polygons and texts of an original input layer into
    /// a fresh layer.
    ///
    /// Idempotent per original index and content restriction: a second call
    /// returns the previously materialized layer.
    pub fn make_layer_from_original(&mut self, index: u32, name: Option<&str>) -> Result<LayerId> {
        self.materialize(index, name, LayerContent::Everything)
    }

    /// Materializes only the polygons of an original input layer.
    pub fn make_polygon_layer(&mut self, index: u32, name: Option<&str>) -> Result<LayerId> {
        self.materialize(index, name, LayerContent::Polygons)
    }

    /// Materializes only the texts of an original input layer.
    pub fn make_text_layer(&mut self, index: u32, name: Option<&str>) -> Result<LayerId> {
        self.materialize(index, name, LayerContent::Texts)
    }

    fn materialize(
        &mut self,
        index: u32,
        name: Option<&str>,
        content: LayerContent,
    ) -> Result<LayerId> {
        if let Some(existing) = self.registry.layer_by_original(index, content) {
            return Ok(existing);
        }
        let store = self.dss()?;
        let mut layout = store.write().unwrap();
        let src = layout
            .original_layer(index)
            .ok_or(Error::InvalidLayerIndex(index))?;
        let layer = layout.alloc_layer();
        let cells: Vec<CellId> = layout.cells().map(|(id, _)| id).collect();
        for cell in cells {
            if content != LayerContent::Texts {
                let shapes = layout.cell(cell).shapes_on(src).to_vec();
                for shape in shapes {
                    layout.insert_db_shape(cell, layer, shape);
                }
            }
            if content != LayerContent::Polygons {
                let texts = layout.cell(cell).texts_on(src).to_vec();
                for text in texts {
                    layout.insert_text(cell, layer, text);
                }
            }
        }
        drop(layout);
        self.register_info(layer, LayerOrigin::Original(index), name, content)?;
        self.state = self.state.max(ExtractionState::LayersPrepared);
        Ok(layer)
    }

    /// Adopts an externally filled layer into the registry.
    ///
    /// Naming the layer persists it on save.
    pub fn register_layer(&mut self, layer: LayerId, name: Option<&str>) -> Result<()> {
        self.register_info(layer, LayerOrigin::Derived, name, LayerContent::Everything)?;
        self.state = self.state.max(ExtractionState::LayersPrepared);
        Ok(())
    }

    fn register_info(
        &mut self,
        layer: LayerId,
        origin: LayerOrigin,
        name: Option<&str>,
        content: LayerContent,
    ) -> Result<()> {
        if let Some(name) = name {
            if let Some(existing) = self.registry.layer_by_name(name) {
                if existing != layer {
                    return Err(Error::InvalidArgument(format!(
                        "layer name {name:?} is already bound to {existing}"
                    )));
                }
                return Ok(());
            }
        }
        if self.registry.info(layer).is_some() {
            // Already registered; registering again without a conflicting
            // name is a no-op.
            return Ok(());
        }
        self.registry.register(LayerInfo {
            layer,
            origin,
            name: name.map(ArcStr::from),
            persisted: name.is_some(),
            content,
        });
        Ok(())
    }

    /// The layer bound to the given name, if any.
    pub fn layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.registry.layer_by_name(name)
    }

    /// Returns `true` if the given layer is written out on save.
    pub fn is_persisted(&self, layer: LayerId) -> bool {
        self.registry.is_persisted(layer)
    }

    /// The layer registry.
    pub fn layers(&self) -> &LayerRegistry {
        &self.registry
    }

    // --- connectivity ------------------------------------------------------

    /// Declares an inter-layer connection. Invalidates an extracted
    /// netlist.
    pub fn connect(&mut self, a: LayerId, b: LayerId) {
        self.invalidate();
        self.conn.connect(a, b);
        self.state = self.state.max(ExtractionState::ConnectivityDeclared);
    }

    /// Declares an intra-layer connection. Invalidates an extracted
    /// netlist.
    pub fn connect_layer(&mut self, layer: LayerId) {
        self.connect(layer, layer);
    }

    /// Links a layer to a named global net. Invalidates an extracted
    /// netlist.
    pub fn connect_global(&mut self, layer: LayerId, name: &str) -> Result<GlobalNetId> {
        self.invalidate();
        let id = self.conn.connect_global(layer, name)?;
        self.state = self.state.max(ExtractionState::ConnectivityDeclared);
        Ok(id)
    }

    /// The connectivity declaration.
    pub fn connectivity(&self) -> &Connectivity {
        &self.conn
    }

    fn invalidate(&mut self) {
        if self.state == ExtractionState::NetlistExtracted {
            self.reset_extracted();
        }
    }

    /// Drops the extracted cluster tree and netlist connectivity, keeping
    /// extracted devices and circuit definitions.
    pub fn reset_extracted(&mut self) {
        self.clusters = None;
        if let Some(netlist) = &mut self.netlist {
            netlist.clear_connectivity();
        }
        if self.state == ExtractionState::NetlistExtracted {
            self.state = ExtractionState::ConnectivityDeclared;
        }
    }

    // --- join rules ----------------------------------------------------------

    /// Registers a net-join rule, applied at the end of every extraction in
    /// registration order. Invalidates an extracted netlist.
    pub fn add_join_rule(&mut self, rule: NetJoinRule) {
        self.invalidate();
        self.join_rules.push(rule);
    }

    /// The registered join rules, in registration order.
    pub fn join_rules(&self) -> &[NetJoinRule] {
        &self.join_rules
    }

    // --- device extraction ---------------------------------------------------

    /// Runs a device extractor over every cell reachable from the top cell,
    /// bottom-up.
    ///
    /// `layers` maps the extractor's layer roles to prepared layers; a
    /// missing required role is an [`Error::InvalidArgument`]. Recognition
    /// failures reported by the extractor land in the log journal and do
    /// not abort the run.
    pub fn extract_devices(
        &mut self,
        extractor: &mut dyn DeviceExtractor,
        layers: &IndexMap<ArcStr, LayerId>,
    ) -> Result<()> {
        for role in extractor.layer_roles() {
            if !layers.contains_key(*role) {
                return Err(Error::InvalidArgument(format!(
                    "device extractor {:?} requires a layer for role {:?}",
                    extractor.name(),
                    role
                )));
            }
        }
        let store = self.dss()?;
        let layout = store.read().unwrap();
        let top = layout.top_cell().ok_or(Error::NoLayout)?;
        tracing::info!(extractor = extractor.name(), "extracting devices");
        for cell in layout.cells_under(top) {
            let raw = extractor.extract(DeviceCellView::new(&layout, cell), layers, &mut self.log);
            if raw.is_empty() {
                continue;
            }
            let netlist = self.netlist.get_or_insert_with(Netlist::new);
            let circuit_id = match self.circuit_of_cell.get(&cell) {
                Some(&id) => id,
                None => {
                    let id = netlist.add_circuit(Circuit::with_cell(
                        layout.cell(cell).name().clone(),
                        cell.raw(),
                    ));
                    self.circuit_of_cell.insert(cell, id);
                    id
                }
            };
            let circuit = netlist.circuit_mut(circuit_id);
            let pending = self.pending_terminals.entry(cell).or_default();
            for device in raw {
                let mut d = Device::new(device.name, device.class);
                for (name, value) in device.params {
                    d.set_param(name, value);
                }
                for abs in device.abstracts {
                    d.add_abstract(abs);
                }
                let id = circuit.add_device(d);
                pending.push((id, device.terminals));
            }
        }
        self.state = self.state.max(ExtractionState::DevicesExtracted);
        Ok(())
    }

    // --- netlist extraction ----------------------------------------------------

    /// Runs the cluster engine and assembles the hierarchical netlist.
    pub fn extract_netlist(&mut self) -> Result<()> {
        let store = self.dss()?;
        let layout = store.read().unwrap();
        let top = layout.top_cell().ok_or(Error::NoLayout)?;
        tracing::info!("extracting netlist");
        let clusters = HierClusters::build(&layout, &self.conn, self.threads);
        let mut netlist = self.netlist.take().unwrap_or_default();
        netlist.clear_connectivity();
        let order = layout.cells_under(top);

        // Circuits: cells with clusters or devices, plus the top cell.
        for &cell in &order {
            let has_clusters = clusters.cell(cell).is_some_and(|cc| !cc.is_empty());
            if (has_clusters || cell == top) && !self.circuit_of_cell.contains_key(&cell) {
                let id = netlist.add_circuit(Circuit::with_cell(
                    layout.cell(cell).name().clone(),
                    cell.raw(),
                ));
                self.circuit_of_cell.insert(cell, id);
            }
        }

        // Nets, one per cluster; names from labels, else from globals.
        let mut net_of: HashMap<(CellId, ClusterId), NetId> = HashMap::new();
        for &cell in &order {
            let Some(&circuit_id) = self.circuit_of_cell.get(&cell) else {
                continue;
            };
            let Some(cc) = clusters.cell(cell) else {
                continue;
            };
            for (cluster_id, cluster) in cc.clusters() {
                let mut net = Net::from_cluster(ClusterRef {
                    cell: cell.raw(),
                    cluster: cluster_id.raw(),
                });
                if let Some(first) = cluster.labels().first() {
                    net.set_name(first.clone());
                    for extra in &cluster.labels()[1..] {
                        self.log.append(
                            LogEntry::info(format!(
                                "additional label {extra:?} on net {first:?} ignored"
                            ))
                            .with_cell(cell)
                            .with_category("netlist"),
                        );
                    }
                } else {
                    let globals: Vec<GlobalNetId> = cluster.globals().collect();
                    if let Some(&g) = globals.first() {
                        net.set_name(self.conn.global_net_name(g));
                        if globals.len() > 1 {
                            let names: Vec<String> = globals
                                .iter()
                                .map(|&g| self.conn.global_net_name(g).to_string())
                                .collect();
                            self.log.append(
                                LogEntry::warning(format!(
                                    "cluster shorts global nets: {}",
                                    names.join(", ")
                                ))
                                .with_cell(cell)
                                .with_category("netlist"),
                            );
                        }
                    }
                }
                let net_id = netlist.circuit_mut(circuit_id).add_net(net);
                net_of.insert((cell, cluster_id), net_id);
            }
        }

        // Pins for clusters connected upward in any instantiation.
        let mut pin_of: HashMap<(CellId, ClusterId), PinId> = HashMap::new();
        for &cell in &order {
            let Some(&circuit_id) = self.circuit_of_cell.get(&cell) else {
                continue;
            };
            for cluster in clusters.upward_clusters(cell) {
                let net_id = net_of[&(cell, cluster)];
                let circuit = netlist.circuit_mut(circuit_id);
                let name = circuit.net_display_name(net_id);
                let pin_id = circuit.add_pin(Pin::new(name, net_id));
                pin_of.insert((cell, cluster), pin_id);
            }
        }

        // Subcircuit instances with pin bindings from the recorded
        // cluster connections.
        for &cell in &order {
            let Some(&parent_circuit) = self.circuit_of_cell.get(&cell) else {
                continue;
            };
            for (idx, inst) in layout.cell(cell).instances().iter().enumerate() {
                let Some(&child_circuit) = self.circuit_of_cell.get(&inst.child()) else {
                    continue;
                };
                let mut sc =
                    SubCircuit::new(child_circuit, inst.name().clone(), inst.transformation());
                if let Some(cc) = clusters.cell(cell) {
                    for conn in cc.connections() {
                        if conn.instance == idx {
                            sc.connect(
                                pin_of[&(inst.child(), conn.child)],
                                net_of[&(cell, conn.parent)],
                            );
                        }
                    }
                }
                netlist.circuit_mut(parent_circuit).add_subcircuit(sc);
            }
        }

        // Device terminal binding: locate the cluster interacting with the
        // terminal shape on the terminal layer.
        for &cell in &order {
            let Some(list) = self.pending_terminals.get(&cell) else {
                continue;
            };
            let circuit_id = self.circuit_of_cell[&cell];
            for (device_id, terminals) in list {
                let device_name = netlist.circuit(circuit_id).device(*device_id).name().clone();
                for term in terminals {
                    let mut bound = None;
                    if let Some(cc) = clusters.cell(cell) {
                        for (cluster_id, cluster) in cc.clusters() {
                            if cluster
                                .shapes_on(term.layer)
                                .iter()
                                .any(|s| s.interacts(&term.shape))
                            {
                                bound = net_of.get(&(cell, cluster_id)).copied();
                                break;
                            }
                        }
                    }
                    let net_id = match bound {
                        Some(net_id) => net_id,
                        None => {
                            self.log.append(
                                LogEntry::error(format!(
                                    "terminal {:?} of device {device_name:?} is not connected",
                                    term.role
                                ))
                                .with_cell(cell)
                                .with_geometry(term.shape.clone())
                                .with_category("devices"),
                            );
                            netlist.circuit_mut(circuit_id).add_net(Net::new())
                        }
                    };
                    netlist
                        .circuit_mut(circuit_id)
                        .device_mut(*device_id)
                        .connect_terminal(term.role.clone(), net_id);
                }
            }
        }

        // Join passes: label-identity joins first, then registered rules in
        // registration order.
        let circuit_names: Vec<(CircuitId, ArcStr)> = netlist
            .circuits()
            .map(|(id, c)| (id, c.name().clone()))
            .collect();
        for &(id, _) in &circuit_names {
            join_label_identity(netlist.circuit_mut(id));
        }
        let top_circuit = self.circuit_of_cell[&top];
        for rule in &self.join_rules {
            match rule {
                NetJoinRule::Glob(pattern) => {
                    join_matching(netlist.circuit_mut(top_circuit), |name| {
                        pattern.matches(name)
                    });
                }
                NetJoinRule::NameSet(names) => {
                    join_matching(netlist.circuit_mut(top_circuit), |name| {
                        names.iter().any(|n| n == name)
                    });
                }
                NetJoinRule::CellGlob { cell, net } => {
                    for (id, circuit_name) in &circuit_names {
                        if cell.matches(circuit_name) {
                            join_matching(netlist.circuit_mut(*id), |name| net.matches(name));
                        }
                    }
                }
                NetJoinRule::CellNameSet { cell, nets } => {
                    for (id, circuit_name) in &circuit_names {
                        if cell.matches(circuit_name) {
                            join_matching(netlist.circuit_mut(*id), |name| {
                                nets.iter().any(|n| n == name)
                            });
                        }
                    }
                }
            }
        }

        if !self.include_floating_subcircuits {
            for id in netlist.circuit_ids() {
                netlist
                    .circuit_mut(id)
                    .retain_subcircuits(|_, sc| sc.num_connections() > 0);
            }
        }

        netlist.set_top(top_circuit);
        drop(layout);
        self.netlist = Some(netlist);
        self.clusters = Some(clusters);
        self.state = ExtractionState::NetlistExtracted;
        Ok(())
    }

    /// The extracted netlist, if one is current.
    pub fn netlist(&self) -> Option<&Netlist> {
        self.netlist.as_ref()
    }

    /// Installs an externally produced netlist as the extracted one.
    ///
    /// This is the trusted-loader escape hatch: no consistency checks are
    /// performed against the shape store, and geometry queries
    /// ([`shapes_of_net`](Self::shapes_of_net)) require a cluster tree and
    /// stay unavailable.
    pub fn set_netlist_extracted(&mut self, netlist: Netlist) {
        self.netlist = Some(netlist);
        self.state = ExtractionState::NetlistExtracted;
    }

    /// The cluster tree of the last extraction, if current.
    pub fn clusters(&self) -> Option<&HierClusters> {
        self.clusters.as_ref()
    }

    /// The circuit extracted from the given cell, if any.
    pub fn circuit_of_cell(&self, cell: CellId) -> Option<CircuitId> {
        self.circuit_of_cell.get(&cell).copied()
    }

    /// Promotes accumulated error-severity log entries into a hard error.
    pub fn check_extraction_errors(&self) -> Result<()> {
        if !self.log.has_error() {
            return Ok(());
        }
        let message = self
            .log
            .iter()
            .filter(|entry| entry.severity().is_error())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Err(Error::Extraction(message))
    }

    /// The extraction log journal.
    pub fn log(&self) -> &Journal<LogEntry> {
        &self.log
    }

    /// Appends an entry to the extraction log.
    pub fn log_entry(&mut self, entry: LogEntry) {
        self.log.append(entry);
    }

    /// Clears the extraction log.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// The recursive geometry of a net, in the coordinate frame of its
    /// circuit's cell.
    ///
    /// # Panics
    ///
    /// Panics if no netlist has been extracted, or the netlist was
    /// installed without a cluster tree.
    pub fn shapes_of_net(&self, circuit: CircuitId, net: NetId) -> Vec<(LayerId, Shape)> {
        assert!(
            self.is_netlist_extracted(),
            "shapes_of_net requires an extracted netlist"
        );
        let clusters = self.clusters.as_ref().expect("no cluster tree available");
        let netlist = self.netlist.as_ref().expect("no netlist available");
        let store = self.dss().expect("no shape store available");
        let layout = store.read().unwrap();
        let mut out = Vec::new();
        for cluster_ref in netlist.circuit(circuit).net(net).clusters() {
            clusters.for_each_shape(
                &layout,
                CellId::from_raw(cluster_ref.cell),
                ClusterId::from_raw(cluster_ref.cluster),
                Transformation::identity(),
                &mut |layer, shape| out.push((layer, shape)),
            );
        }
        out
    }
}

/// Merges all nets sharing a label into one, lowest id surviving.
fn join_label_identity(circuit: &mut Circuit) {
    let mut groups: IndexMap<ArcStr, Vec<NetId>> = IndexMap::new();
    for (id, net) in circuit.nets() {
        if let Some(name) = net.name() {
            groups.entry(name.clone()).or_default().push(id);
        }
    }
    for (_, mut ids) in groups {
        ids.sort_unstable();
        if let Some((&survivor, rest)) = ids.split_first() {
            for &other in rest {
                circuit.merge_nets(survivor, other);
            }
        }
    }
}

/// Merges all named nets matching the predicate into one, lowest id
/// surviving.
fn join_matching(circuit: &mut Circuit, mut matches: impl FnMut(&str) -> bool) {
    let mut matching: Vec<NetId> = circuit
        .nets()
        .filter(|(_, net)| net.name().is_some_and(|name| matches(name)))
        .map(|(id, _)| id)
        .collect();
    matching.sort_unstable();
    if let Some((&survivor, rest)) = matching.split_first() {
        for &other in rest {
            circuit.merge_nets(survivor, other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_is_validated() {
        let mut l2n = LayoutToNetlist::new(Layout::new(0.001));
        assert!(l2n.set_threads(0).is_err());
        assert!(l2n.set_threads(4).is_ok());
        assert!(l2n.set_area_ratio(0.0).is_err());
        assert!(l2n.set_area_ratio(f64::NAN).is_err());
        assert!(l2n.set_area_ratio(2.5).is_ok());
        assert!(l2n.set_max_vertex_count(3).is_err());
        assert!(l2n.set_max_vertex_count(0).is_ok());
        assert!(l2n.set_max_vertex_count(16).is_ok());
    }

    #[test]
    fn external_dss_can_dangle() {
        let store = Arc::new(RwLock::new(Layout::new(0.001)));
        let mut l2n = LayoutToNetlist::with_external_dss(&store);
        assert!(l2n.dss().is_ok());
        drop(store);
        assert!(matches!(l2n.dss(), Err(Error::NoShapeStore)));
        assert!(l2n.make_layer(None).is_err());

        let store = Arc::new(RwLock::new(Layout::new(0.001)));
        let mut l2n = LayoutToNetlist::with_external_dss(&store);
        l2n.keep_dss();
        drop(store);
        assert!(l2n.dss().is_ok());
    }

    #[test]
    fn unknown_original_layer_is_an_error() {
        let mut l2n = LayoutToNetlist::new(Layout::new(0.001));
        assert!(matches!(
            l2n.make_layer_from_original(42, None),
            Err(Error::InvalidLayerIndex(42))
        ));
    }

    #[test]
    fn layer_names_are_unique() {
        let mut l2n = LayoutToNetlist::new(Layout::new(0.001));
        let a = l2n.make_layer(Some("metal1")).unwrap();
        assert!(l2n.make_layer(Some("metal1")).is_err());
        assert_eq!(l2n.layer_by_name("metal1"), Some(a));
        assert!(l2n.is_persisted(a));
        let b = l2n.make_layer(None).unwrap();
        assert!(!l2n.is_persisted(b));
    }
}
