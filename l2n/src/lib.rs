//! Netlist extraction from the polygon representation of an IC layout.
//!
//! The entry point is [`LayoutToNetlist`]: feed it a hierarchical shape
//! store ([`layout::Layout`]), prepare layers, run device extractors,
//! declare layer connectivity, and call
//! [`extract_netlist`](LayoutToNetlist::extract_netlist) to obtain a
//! hierarchical [`netir::Netlist`] plus the cluster tree mapping every net
//! back to its geometry.
//!
//! Post-extraction utilities cover the reverse direction:
//! [`builder::NetBuilder`] re-materializes nets as geometry,
//! [`LayoutToNetlist::probe_net`] finds the net under a point, and
//! [`LayoutToNetlist::antenna_check`] runs area/perimeter ratio rules over
//! the cluster tree. [`LayoutVsSchematic`] wraps the extractor together
//! with a reference netlist for LVS-style comparison.

#![warn(missing_docs)]

pub mod antenna;
pub mod builder;
pub mod clusters;
pub mod connectivity;
pub mod devices;
pub mod error;
pub mod io;
pub mod layers;
pub mod layout;
pub mod log;
pub mod lvs;
pub mod netlist;
pub mod pattern;
pub mod probe;

#[cfg(test)]
pub(crate) mod tests;

pub use antenna::AntennaViolation;
pub use builder::{BuildNetHierarchy, NetBuilder, NetBuilderConfig};
pub use clusters::{ClusterId, HierClusters};
pub use connectivity::{Connectivity, GlobalNetId};
pub use devices::{DeviceCellView, DeviceExtractor, RawDevice, RawTerminal};
pub use error::{Error, Result};
pub use io::{create_from_file, AnyDb};
pub use layout::{CellId, LayerId, Layout};
pub use log::LogEntry;
pub use lvs::{CrossReference, LayoutVsSchematic, NetlistComparer};
pub use netlist::{ExtractionState, LayoutToNetlist, NetJoinRule};
pub use pattern::GlobPattern;
pub use probe::ProbeResult;
