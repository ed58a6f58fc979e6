//! Layout-versus-schematic comparison wrapper.
//!
//! Comparison itself is pluggable: an embedder supplies a
//! [`NetlistComparer`], and [`LayoutVsSchematic`] combines the extraction
//! engine with a reference netlist and the resulting cross-reference.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock};

use netir::{CircuitId, NetId, Netlist};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::netlist::LayoutToNetlist;

/// How two compared objects relate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Matched successfully.
    Match,
    /// Paired but different.
    Mismatch,
    /// Present only in the extracted netlist.
    ExtractedOnly,
    /// Present only in the reference netlist.
    ReferenceOnly,
}

/// The pairing of one extracted net with one reference net.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetXref {
    /// The extracted net, if paired.
    pub extracted: Option<NetId>,
    /// The reference net, if paired.
    pub reference: Option<NetId>,
    /// The pairing status.
    pub status: MatchStatus,
}

/// The pairing of one extracted circuit with one reference circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitXref {
    /// The extracted circuit, if paired.
    pub extracted: Option<CircuitId>,
    /// The reference circuit, if paired.
    pub reference: Option<CircuitId>,
    /// The pairing status.
    pub status: MatchStatus,
    /// The net pairings within this circuit pair.
    pub nets: Vec<NetXref>,
}

/// The navigable result of a netlist comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    /// Whether the netlists matched overall.
    pub matched: bool,
    /// Per-circuit pairings.
    pub circuits: Vec<CircuitXref>,
}

/// A netlist comparison algorithm.
pub trait NetlistComparer {
    /// Compares the extracted netlist against the reference and produces a
    /// cross-reference.
    fn compare(&self, extracted: &Netlist, reference: &Netlist) -> CrossReference;
}

/// An extraction engine paired with a reference netlist for LVS.
///
/// Derefs to [`LayoutToNetlist`], so the full extraction API is available
/// directly.
pub struct LayoutVsSchematic {
    pub(crate) base: LayoutToNetlist,
    pub(crate) reference: Option<Netlist>,
    pub(crate) xref: Option<CrossReference>,
}

impl LayoutVsSchematic {
    /// Creates an LVS database owning the given shape store.
    pub fn new(layout: Layout) -> Self {
        Self::from(LayoutToNetlist::new(layout))
    }

    /// Creates an LVS database borrowing an externally owned shape store.
    pub fn with_external_dss(store: &Arc<RwLock<Layout>>) -> Self {
        Self::from(LayoutToNetlist::with_external_dss(store))
    }

    /// Attaches the reference (schematic) netlist.
    ///
    /// Invalidates a previous comparison result.
    pub fn set_reference(&mut self, reference: Netlist) {
        self.reference = Some(reference);
        self.xref = None;
    }

    /// The attached reference netlist, if any.
    pub fn reference(&self) -> Option<&Netlist> {
        self.reference.as_ref()
    }

    /// Runs the given comparer against the extracted and reference
    /// netlists, storing and returning the overall match result.
    ///
    /// # Panics
    ///
    /// Panics if no netlist has been extracted.
    pub fn compare(&mut self, comparer: &dyn NetlistComparer) -> Result<bool> {
        assert!(
            self.base.is_netlist_extracted(),
            "comparison requires an extracted netlist"
        );
        let extracted = self.base.netlist().expect("no netlist available");
        let reference = self.reference.as_ref().ok_or_else(|| {
            Error::InvalidArgument("no reference netlist attached".to_string())
        })?;
        let xref = comparer.compare(extracted, reference);
        let matched = xref.matched;
        self.xref = Some(xref);
        Ok(matched)
    }

    /// The cross-reference of the last comparison, if any.
    pub fn xref(&self) -> Option<&CrossReference> {
        self.xref.as_ref()
    }
}

impl From<LayoutToNetlist> for LayoutVsSchematic {
    fn from(base: LayoutToNetlist) -> Self {
        Self {
            base,
            reference: None,
            xref: None,
        }
    }
}

impl Deref for LayoutVsSchematic {
    type Target = LayoutToNetlist;
    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for LayoutVsSchematic {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}
