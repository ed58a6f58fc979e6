//! Saving and loading extraction databases.
//!
//! Databases serialize to a self-describing JSON file carrying a kind tag,
//! the layout snapshot (persisted layers only), the layer registry,
//! connectivity, cluster tree, netlist, log journal, and configuration.
//! LVS databases additionally carry the reference netlist and the last
//! cross-reference.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{Arc, RwLock};

use arcstr::ArcStr;
use diagnostics::Journal;
use netir::{CircuitId, DeviceId, Netlist};
use serde::{Deserialize, Serialize};

use crate::clusters::HierClusters;
use crate::connectivity::Connectivity;
use crate::devices::RawTerminal;
use crate::error::{Error, Result};
use crate::layers::LayerRegistry;
use crate::layout::{CellId, Layout};
use crate::log::LogEntry;
use crate::lvs::{CrossReference, LayoutVsSchematic};
use crate::netlist::{Dss, ExtractionState, LayoutToNetlist, NetJoinRule};

/// The kind tag of a database file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum DbKind {
    L2n,
    Lvs,
}

/// A loaded database of either kind.
pub enum AnyDb {
    /// A plain extraction database.
    L2n(Box<LayoutToNetlist>),
    /// An LVS database.
    Lvs(Box<LayoutVsSchematic>),
}

#[derive(Serialize, Deserialize)]
struct DbFile {
    kind: DbKind,
    name: ArcStr,
    description: ArcStr,
    generator: ArcStr,
    layout: Option<Layout>,
    registry: LayerRegistry,
    connectivity: Connectivity,
    clusters: Option<HierClusters>,
    netlist: Option<Netlist>,
    circuit_of_cell: HashMap<CellId, CircuitId>,
    pending_terminals: HashMap<CellId, Vec<(DeviceId, Vec<RawTerminal>)>>,
    log: Journal<LogEntry>,
    join_rules: Vec<NetJoinRule>,
    include_floating_subcircuits: bool,
    threads: usize,
    area_ratio: f64,
    max_vertex_count: usize,
    state: ExtractionState,
    reference: Option<Netlist>,
    xref: Option<CrossReference>,
}

impl DbFile {
    fn capture(l2n: &LayoutToNetlist, kind: DbKind) -> Self {
        // Snapshot the store, stripping layers registered as
        // non-persisted.
        let layout = l2n.dss().ok().map(|store| {
            let mut snapshot = store.read().unwrap().clone();
            for info in l2n.layers().layers() {
                if !info.persisted {
                    snapshot.remove_layer(info.layer);
                }
            }
            snapshot
        });
        Self {
            kind,
            name: l2n.name.clone(),
            description: l2n.description.clone(),
            generator: l2n.generator.clone(),
            layout,
            registry: l2n.registry.clone(),
            connectivity: l2n.conn.clone(),
            clusters: l2n.clusters.clone(),
            netlist: l2n.netlist.clone(),
            circuit_of_cell: l2n.circuit_of_cell.clone(),
            pending_terminals: l2n.pending_terminals.clone(),
            log: l2n.log.clone(),
            join_rules: l2n.join_rules.clone(),
            include_floating_subcircuits: l2n.include_floating_subcircuits,
            threads: l2n.threads,
            area_ratio: l2n.area_ratio,
            max_vertex_count: l2n.max_vertex_count,
            state: l2n.state,
            reference: None,
            xref: None,
        }
    }

    fn restore(self) -> LayoutToNetlist {
        let dss = match self.layout {
            Some(layout) => Dss::Owned(Arc::new(RwLock::new(layout))),
            None => Dss::None,
        };
        let mut conn = self.connectivity;
        conn.rebuild_lookup();
        let mut l2n = LayoutToNetlist::from_dss(dss);
        l2n.name = self.name;
        l2n.description = self.description;
        l2n.generator = self.generator;
        l2n.registry = self.registry;
        l2n.conn = conn;
        l2n.clusters = self.clusters;
        l2n.netlist = self.netlist;
        l2n.circuit_of_cell = self.circuit_of_cell;
        l2n.pending_terminals = self.pending_terminals;
        l2n.log = self.log;
        l2n.join_rules = self.join_rules;
        l2n.include_floating_subcircuits = self.include_floating_subcircuits;
        l2n.threads = self.threads;
        l2n.area_ratio = self.area_ratio;
        l2n.max_vertex_count = self.max_vertex_count;
        l2n.state = self.state;
        l2n
    }

    fn write(&self, path: &Path, short_format: bool) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        if short_format {
            serde_json::to_writer(writer, self)?;
        } else {
            serde_json::to_writer_pretty(writer, self)?;
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|_| Error::UnknownFormat(path.to_path_buf()))
    }
}

impl LayoutToNetlist {
    /// Writes this database to the given path. `short_format` selects
    /// compact over pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>, short_format: bool) -> Result<()> {
        DbFile::capture(self, DbKind::L2n).write(path.as_ref(), short_format)
    }

    /// Reads a database written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = DbFile::read(path)?;
        match file.kind {
            DbKind::L2n => Ok(file.restore()),
            DbKind::Lvs => Err(Error::UnknownFormat(path.to_path_buf())),
        }
    }
}

impl LayoutVsSchematic {
    /// Writes this database, including the reference netlist and the last
    /// cross-reference, to the given path.
    pub fn save(&self, path: impl AsRef<Path>, short_format: bool) -> Result<()> {
        let mut file = DbFile::capture(&self.base, DbKind::Lvs);
        file.reference = self.reference.clone();
        file.xref = self.xref.clone();
        file.write(path.as_ref(), short_format)
    }

    /// Reads a database written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = DbFile::read(path)?;
        match file.kind {
            DbKind::Lvs => {
                let reference = file.reference.take();
                let xref = file.xref.take();
                let mut lvs = LayoutVsSchematic::from(file.restore());
                lvs.reference = reference;
                lvs.xref = xref;
                Ok(lvs)
            }
            DbKind::L2n => Err(Error::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// Loads a database of either kind, dispatching on the kind tag.
pub fn create_from_file(path: impl AsRef<Path>) -> Result<AnyDb> {
    let file = DbFile::read(path.as_ref())?;
    match file.kind {
        DbKind::L2n => Ok(AnyDb::L2n(Box::new(file.restore()))),
        DbKind::Lvs => {
            let mut file = file;
            let reference = file.reference.take();
            let xref = file.xref.take();
            let mut lvs = LayoutVsSchematic::from(file.restore());
            lvs.reference = reference;
            lvs.xref = xref;
            Ok(AnyDb::Lvs(Box::new(lvs)))
        }
    }
}
