//! Hierarchical netlist intermediate representation.
//!
//! A [`Netlist`] owns its [`Circuit`]s; a circuit owns its nets, pins,
//! devices, and subcircuit instances. All cross-references between entities
//! are opaque ids, never ownership, so the whole structure is arena-style
//! and serializable.
//!
//! The structures here use strings rather than generics for device terminal
//! roles and parameters: the netlist is produced by geometric extraction
//! and consumed by comparison/export code that works on names.

#![warn(missing_docs)]

use std::collections::HashMap;
use std::fmt::Display;

use arcstr::ArcStr;
use geometry::{Shape, Transformation};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// An opaque circuit identifier.
///
/// A circuit ID created in the context of one netlist must *not* be used in
/// the context of another netlist.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CircuitId(u64);

/// An opaque net identifier, scoped to one circuit.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NetId(u64);

/// An opaque pin identifier, scoped to one circuit.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PinId(u64);

/// An opaque device identifier, scoped to one circuit.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DeviceId(u64);

/// An opaque subcircuit-instance identifier, scoped to one circuit.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SubCircuitId(u64);

impl Display for CircuitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "circuit{}", self.0)
    }
}

impl Display for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "net{}", self.0)
    }
}

impl Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pin{}", self.0)
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device{}", self.0)
    }
}

impl Display for SubCircuitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subcircuit{}", self.0)
    }
}

/// A reference to the hierarchical cluster a net was derived from.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClusterRef {
    /// The id of the layout cell owning the cluster.
    pub cell: u64,
    /// The cluster id within that cell.
    pub cluster: u32,
}

/// A hierarchical netlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    circuit_id: u64,
    circuits: IndexMap<CircuitId, Circuit>,
    name_map: HashMap<ArcStr, CircuitId>,
    top: Option<CircuitId>,
}

impl Netlist {
    /// Creates a new, empty netlist.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds the given circuit to the netlist.
    pub fn add_circuit(&mut self, circuit: Circuit) -> CircuitId {
        self.circuit_id += 1;
        let id = CircuitId(self.circuit_id);
        self.name_map.insert(circuit.name.clone(), id);
        self.circuits.insert(id, circuit);
        id
    }

    /// Gets the circuit with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no circuit with the given ID exists.
    pub fn circuit(&self, id: CircuitId) -> &Circuit {
        self.try_circuit(id).expect("no circuit with the given id")
    }

    /// Gets the circuit with the given ID.
    pub fn try_circuit(&self, id: CircuitId) -> Option<&Circuit> {
        self.circuits.get(&id)
    }

    /// Gets a mutable reference to the circuit with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no circuit with the given ID exists.
    pub fn circuit_mut(&mut self, id: CircuitId) -> &mut Circuit {
        self.circuits
            .get_mut(&id)
            .expect("no circuit with the given id")
    }

    /// Gets the circuit with the given name.
    pub fn try_circuit_named(&self, name: &str) -> Option<&Circuit> {
        self.try_circuit(*self.name_map.get(name)?)
    }

    /// Gets the circuit ID corresponding to the given name.
    pub fn try_circuit_id_named(&self, name: &str) -> Option<CircuitId> {
        self.name_map.get(name).copied()
    }

    /// Iterates over the `(id, circuit)` pairs in this netlist, in insertion
    /// order.
    pub fn circuits(&self) -> impl Iterator<Item = (CircuitId, &Circuit)> {
        self.circuits.iter().map(|(id, c)| (*id, c))
    }

    /// The ids of all circuits, in insertion order.
    pub fn circuit_ids(&self) -> Vec<CircuitId> {
        self.circuits.keys().copied().collect()
    }

    /// The number of circuits in this netlist.
    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    /// Returns `true` if this netlist has no circuits.
    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }

    /// Marks the given circuit as the top circuit.
    pub fn set_top(&mut self, id: CircuitId) {
        self.top = Some(id);
    }

    /// The top circuit, if one was designated.
    pub fn top_circuit(&self) -> Option<CircuitId> {
        self.top
    }

    /// Drops nets, pins, and subcircuit instances from every circuit and
    /// unbinds all device terminals.
    ///
    /// Devices themselves (and circuit definitions) are kept: this is the
    /// reset performed when extracted connectivity is invalidated.
    pub fn clear_connectivity(&mut self) {
        for circuit in self.circuits.values_mut() {
            circuit.clear_connectivity();
        }
    }
}

/// The netlist representation of one electrically relevant layout cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    name: ArcStr,
    /// The id of the layout cell this circuit was derived from.
    cell: Option<u64>,
    net_id: u64,
    pin_id: u64,
    device_id: u64,
    subcircuit_id: u64,
    nets: IndexMap<NetId, Net>,
    pins: IndexMap<PinId, Pin>,
    devices: IndexMap<DeviceId, Device>,
    subcircuits: IndexMap<SubCircuitId, SubCircuit>,
}

impl Circuit {
    /// Creates a new, empty circuit with the given name.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            cell: None,
            net_id: 0,
            pin_id: 0,
            device_id: 0,
            subcircuit_id: 0,
            nets: Default::default(),
            pins: Default::default(),
            devices: Default::default(),
            subcircuits: Default::default(),
        }
    }

    /// Creates a new circuit derived from the given layout cell.
    pub fn with_cell(name: impl Into<ArcStr>, cell: u64) -> Self {
        let mut c = Self::new(name);
        c.cell = Some(cell);
        c
    }

    /// The name of the circuit.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The id of the layout cell this circuit was derived from, if any.
    #[inline]
    pub fn cell(&self) -> Option<u64> {
        self.cell
    }

    /// Adds the given net to this circuit.
    pub fn add_net(&mut self, net: Net) -> NetId {
        self.net_id += 1;
        let id = NetId(self.net_id);
        self.nets.insert(id, net);
        id
    }

    /// Gets the net with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no net with the given ID exists.
    pub fn net(&self, id: NetId) -> &Net {
        self.try_net(id).expect("no net with the given id")
    }

    /// Gets the net with the given ID.
    pub fn try_net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(&id)
    }

    /// Gets a mutable reference to the net with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no net with the given ID exists.
    pub fn net_mut(&mut self, id: NetId) -> &mut Net {
        self.nets.get_mut(&id).expect("no net with the given id")
    }

    /// Iterates over the `(id, net)` pairs of this circuit.
    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets.iter().map(|(id, n)| (*id, n))
    }

    /// The number of nets in this circuit.
    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    /// The display name of the given net: its label if it has one, or a
    /// `$<id>` placeholder otherwise.
    pub fn net_display_name(&self, id: NetId) -> ArcStr {
        match self.net(id).name() {
            Some(name) => name.clone(),
            None => arcstr::format!("${}", id.0),
        }
    }

    /// Finds the net with the given display name.
    pub fn net_by_display_name(&self, name: &str) -> Option<NetId> {
        self.nets()
            .find(|(id, _)| self.net_display_name(*id) == name)
            .map(|(id, _)| id)
    }

    /// Adds the given pin to this circuit.
    pub fn add_pin(&mut self, pin: Pin) -> PinId {
        self.pin_id += 1;
        let id = PinId(self.pin_id);
        self.pins.insert(id, pin);
        id
    }

    /// Gets the pin with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no pin with the given ID exists.
    pub fn pin(&self, id: PinId) -> &Pin {
        self.pins.get(&id).expect("no pin with the given id")
    }

    /// Iterates over the `(id, pin)` pairs of this circuit.
    pub fn pins(&self) -> impl Iterator<Item = (PinId, &Pin)> {
        self.pins.iter().map(|(id, p)| (*id, p))
    }

    /// Adds the given device to this circuit.
    pub fn add_device(&mut self, device: Device) -> DeviceId {
        self.device_id += 1;
        let id = DeviceId(self.device_id);
        self.devices.insert(id, device);
        id
    }

    /// Gets the device with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no device with the given ID exists.
    pub fn device(&self, id: DeviceId) -> &Device {
        self.devices.get(&id).expect("no device with the given id")
    }

    /// Gets a mutable reference to the device with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no device with the given ID exists.
    pub fn device_mut(&mut self, id: DeviceId) -> &mut Device {
        self.devices
            .get_mut(&id)
            .expect("no device with the given id")
    }

    /// Iterates over the `(id, device)` pairs of this circuit.
    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Device)> {
        self.devices.iter().map(|(id, d)| (*id, d))
    }

    /// Adds the given subcircuit instance to this circuit.
    pub fn add_subcircuit(&mut self, subcircuit: SubCircuit) -> SubCircuitId {
        self.subcircuit_id += 1;
        let id = SubCircuitId(self.subcircuit_id);
        self.subcircuits.insert(id, subcircuit);
        id
    }

    /// Gets a mutable reference to the subcircuit with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no subcircuit with the given ID exists.
    pub fn subcircuit_mut(&mut self, id: SubCircuitId) -> &mut SubCircuit {
        self.subcircuits
            .get_mut(&id)
            .expect("no subcircuit with the given id")
    }

    /// Iterates over the `(id, subcircuit)` pairs of this circuit.
    pub fn subcircuits(&self) -> impl Iterator<Item = (SubCircuitId, &SubCircuit)> {
        self.subcircuits.iter().map(|(id, s)| (*id, s))
    }

    /// The number of subcircuit instances in this circuit.
    pub fn num_subcircuits(&self) -> usize {
        self.subcircuits.len()
    }

    /// Removes the subcircuit instances for which `keep` returns `false`.
    pub fn retain_subcircuits(&mut self, mut keep: impl FnMut(SubCircuitId, &SubCircuit) -> bool) {
        self.subcircuits.retain(|id, sc| keep(*id, sc));
    }

    /// Merges `other` into `survivor`, reattaching every device terminal,
    /// pin binding, and subcircuit connection of `other`, then deletes
    /// `other`.
    ///
    /// The survivor keeps its own name; if it has none, it adopts the name
    /// of the merged net.
    ///
    /// # Panics
    ///
    /// Panics if the two ids are equal or if either net does not exist.
    pub fn merge_nets(&mut self, survivor: NetId, other: NetId) {
        assert_ne!(survivor, other, "cannot merge a net into itself");
        assert!(self.nets.contains_key(&survivor));
        let removed = self
            .nets
            .shift_remove(&other)
            .expect("no net with the given id");
        tracing::debug!(%survivor, %other, circuit = %self.name, "merging nets");
        let kept = self.nets.get_mut(&survivor).unwrap();
        if kept.name.is_none() {
            kept.name = removed.name;
        }
        kept.clusters.extend(removed.clusters);
        for device in self.devices.values_mut() {
            for net in device.terminals.values_mut() {
                if *net == other {
                    *net = survivor;
                }
            }
        }
        for pin in self.pins.values_mut() {
            if pin.net == Some(other) {
                pin.net = Some(survivor);
            }
        }
        for subcircuit in self.subcircuits.values_mut() {
            for net in subcircuit.connections.values_mut() {
                if *net == other {
                    *net = survivor;
                }
            }
        }
    }

    /// Drops nets, pins, and subcircuit instances and unbinds all device
    /// terminals, keeping the devices themselves.
    pub fn clear_connectivity(&mut self) {
        self.nets.clear();
        self.pins.clear();
        self.subcircuits.clear();
        self.net_id = 0;
        self.pin_id = 0;
        self.subcircuit_id = 0;
        for device in self.devices.values_mut() {
            device.terminals.clear();
        }
    }
}

/// The netlist representation of one electrical cluster: the "wire".
///
/// A net derived from extraction references the hierarchical cluster it was
/// built from; merging nets (via join rules) unions the cluster references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Net {
    name: Option<ArcStr>,
    clusters: Vec<ClusterRef>,
}

impl Net {
    /// Creates a new, unnamed net.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a net derived from the given cluster.
    pub fn from_cluster(cluster: ClusterRef) -> Self {
        Self {
            name: None,
            clusters: vec![cluster],
        }
    }

    /// The label-derived name of this net, if any.
    #[inline]
    pub fn name(&self) -> Option<&ArcStr> {
        self.name.as_ref()
    }

    /// Sets the name of this net.
    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = Some(name.into());
    }

    /// The cluster this net was originally derived from, if any.
    #[inline]
    pub fn cluster(&self) -> Option<ClusterRef> {
        self.clusters.first().copied()
    }

    /// All clusters composing this net (more than one after merges).
    #[inline]
    pub fn clusters(&self) -> &[ClusterRef] {
        &self.clusters
    }
}

/// A connection point a parent circuit can bind when instantiating this
/// circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    name: ArcStr,
    net: Option<NetId>,
}

impl Pin {
    /// Creates a pin bound to the given internal net.
    pub fn new(name: impl Into<ArcStr>, net: NetId) -> Self {
        Self {
            name: name.into(),
            net: Some(net),
        }
    }

    /// The name of the pin.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The internal net the pin is bound to, if any.
    #[inline]
    pub fn net(&self) -> Option<NetId> {
        self.net
    }
}

/// The geometric footprint of one recognized device, used for highlighting
/// and net building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAbstract {
    /// The layer the footprint shape lives on.
    pub layer: u32,
    /// The footprint shape, in the owning circuit's coordinate frame.
    pub shape: Shape,
}

/// An extracted device instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    name: ArcStr,
    class: ArcStr,
    terminals: IndexMap<ArcStr, NetId>,
    params: IndexMap<ArcStr, Decimal>,
    abstracts: Vec<DeviceAbstract>,
}

impl Device {
    /// Creates a new device of the given class.
    pub fn new(name: impl Into<ArcStr>, class: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            terminals: Default::default(),
            params: Default::default(),
            abstracts: Default::default(),
        }
    }

    /// The name of the device instance.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The device class (e.g. `NMOS`, `RES`).
    #[inline]
    pub fn class(&self) -> &ArcStr {
        &self.class
    }

    /// Binds the terminal with the given role to a net.
    pub fn connect_terminal(&mut self, role: impl Into<ArcStr>, net: NetId) {
        self.terminals.insert(role.into(), net);
    }

    /// Iterates over the `(role, net)` terminal bindings of this device.
    pub fn terminals(&self) -> impl Iterator<Item = (&ArcStr, NetId)> {
        self.terminals.iter().map(|(role, net)| (role, *net))
    }

    /// The net bound to the terminal with the given role, if any.
    pub fn terminal(&self, role: &str) -> Option<NetId> {
        self.terminals.get(role).copied()
    }

    /// Sets a numeric device parameter.
    pub fn set_param(&mut self, name: impl Into<ArcStr>, value: Decimal) {
        self.params.insert(name.into(), value);
    }

    /// Gets a numeric device parameter.
    pub fn param(&self, name: &str) -> Option<Decimal> {
        self.params.get(name).copied()
    }

    /// Adds a geometric footprint to this device.
    pub fn add_abstract(&mut self, abs: DeviceAbstract) {
        self.abstracts.push(abs);
    }

    /// The geometric footprints of this device.
    #[inline]
    pub fn abstracts(&self) -> &[DeviceAbstract] {
        &self.abstracts
    }
}

/// An instance of a circuit inside another circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCircuit {
    child: CircuitId,
    name: ArcStr,
    trans: Transformation,
    /// Child pin -> parent net.
    connections: IndexMap<PinId, NetId>,
}

impl SubCircuit {
    /// Creates a new instance of `child` with the given placement transform.
    pub fn new(child: CircuitId, name: impl Into<ArcStr>, trans: Transformation) -> Self {
        Self {
            child,
            name: name.into(),
            trans,
            connections: Default::default(),
        }
    }

    /// The instantiated circuit.
    #[inline]
    pub fn child(&self) -> CircuitId {
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

    /// Binds a pin of the child circuit to a net of the parent circuit.
    pub fn connect(&mut self, pin: PinId, net: NetId) {
        self.connections.insert(pin, net);
    }

    /// Iterates over the `(child pin, parent net)` bindings of this instance.
    pub fn connections(&self) -> impl Iterator<Item = (PinId, NetId)> + '_ {
        self.connections.iter().map(|(pin, net)| (*pin, *net))
    }

    /// The parent net bound to the given child pin, if any.
    pub fn connection(&self, pin: PinId) -> Option<NetId> {
        self.connections.get(&pin).copied()
    }

    /// The number of bound pins.
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }
}
