//! The connectivity declaration.
//!
//! Connectivity is a symmetric relation over layer handles plus a set of
//! named global nets linked to layers. It is declared up front and drives
//! the cluster engine: shapes on layers `a` and `b` belong to the same
//! cluster when `connected(a, b)` holds and the shapes touch.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::LayerId;

/// An opaque identifier for a global net (e.g. a substrate or well net).
///
/// Ids are dense and assigned in registration order.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GlobalNetId(u32);

impl Display for GlobalNetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "global{}", self.0)
    }
}

/// A symmetric layer connectivity relation plus global net links.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connectivity {
    /// Normalized (low, high) connected layer pairs. A self-pair means
    /// shapes within the layer connect to each other.
    pairs: BTreeSet<(LayerId, LayerId)>,
    /// Global net names, indexed by id.
    global_names: Vec<ArcStr>,
    #[serde(skip)]
    global_ids: HashMap<ArcStr, GlobalNetId>,
    /// Layer -> global nets implicitly connected to every shape on it.
    global_links: BTreeMap<LayerId, BTreeSet<GlobalNetId>>,
}

impl Connectivity {
    /// Creates an empty connectivity declaration.
    pub fn new() -> Self {
        Default::default()
    }

    /// Declares an intra-layer connection: shapes on `layer` that touch
    /// belong to the same cluster.
    pub fn connect_layer(&mut self, layer: LayerId) {
        self.connect(layer, layer);
    }

    /// Declares an inter-layer connection. Symmetric and idempotent.
    ///
    /// Note that `connect(a, b)` with `a != b` does not imply intra-layer
    /// connections on either layer.
    pub fn connect(&mut self, a: LayerId, b: LayerId) {
        self.pairs.insert((a.min(b), a.max(b)));
    }

    /// Links every shape on `layer` to the global net with the given name,
    /// creating the global net if it does not exist yet.
    ///
    /// Also declares an intra-layer connection on `layer`.
    pub fn connect_global(&mut self, layer: LayerId, name: &str) -> Result<GlobalNetId> {
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "global net names must be non-empty".to_string(),
            ));
        }
        let id = self.global_net_id(name);
        self.connect_layer(layer);
        self.global_links.entry(layer).or_default().insert(id);
        Ok(id)
    }

    /// The id of the global net with the given name, creating it if needed.
    ///
    /// Creation is idempotent: the same name always yields the same id.
    pub fn global_net_id(&mut self, name: &str) -> GlobalNetId {
        if let Some(id) = self.global_ids.get(name) {
            return *id;
        }
        let id = GlobalNetId(self.global_names.len() as u32);
        let name = ArcStr::from(name);
        self.global_names.push(name.clone());
        self.global_ids.insert(name, id);
        id
    }

    /// The name of the given global net, or the empty string for an
    /// unknown id.
    pub fn global_net_name(&self, id: GlobalNetId) -> ArcStr {
        self.global_names
            .get(id.0 as usize)
            .cloned()
            .unwrap_or_else(|| arcstr::literal!(""))
    }

    /// The number of registered global nets.
    pub fn num_globals(&self) -> usize {
        self.global_names.len()
    }

    /// Returns `true` if shapes on `a` and `b` connect when they touch.
    pub fn connected(&self, a: LayerId, b: LayerId) -> bool {
        self.pairs.contains(&(a.min(b), a.max(b)))
    }

    /// All layers participating in the connectivity, in handle order.
    pub fn layers(&self) -> BTreeSet<LayerId> {
        let mut layers: BTreeSet<LayerId> = self.global_links.keys().copied().collect();
        for &(a, b) in &self.pairs {
            layers.insert(a);
            layers.insert(b);
        }
        layers
    }

    /// The global nets linked to the given layer.
    pub fn globals_of(&self, layer: LayerId) -> impl Iterator<Item = GlobalNetId> + '_ {
        self.global_links
            .get(&layer)
            .into_iter()
            .flatten()
            .copied()
    }

    /// Rebuilds the name -> id lookup after deserialization.
    pub(crate) fn rebuild_lookup(&mut self) {
        self.global_ids = self
            .global_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), GlobalNetId(i as u32)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_is_symmetric_and_idempotent() {
        let mut conn = Connectivity::new();
        let a = LayerId::from_raw(1);
        let b = LayerId::from_raw(2);
        let before = conn.clone();
        conn.connect(a, b);
        let once = conn.clone();
        conn.connect(b, a);
        conn.connect(a, b);
        assert_ne!(before, once);
        assert_eq!(conn, once);
        assert!(conn.connected(a, b));
        assert!(conn.connected(b, a));
        assert!(!conn.connected(a, a));
    }

    #[test]
    fn global_net_creation_is_idempotent() {
        let mut conn = Connectivity::new();
        let layer = LayerId::from_raw(1);
        let id1 = conn.connect_global(layer, "vdd").unwrap();
        let id2 = conn.connect_global(layer, "vdd").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(conn.num_globals(), 1);
        assert_eq!(conn.global_net_name(id1).as_str(), "vdd");
        assert_eq!(conn.global_net_name(GlobalNetId(9)).as_str(), "");
        assert!(conn.connect_global(layer, "").is_err());
    }

    #[test]
    fn connect_global_implies_intra_layer_connection() {
        let mut conn = Connectivity::new();
        let layer = LayerId::from_raw(3);
        conn.connect_global(layer, "bulk").unwrap();
        assert!(conn.connected(layer, layer));
        assert_eq!(conn.globals_of(layer).count(), 1);
    }
}
