//! The device extraction invocation protocol.
//!
//! Device recognition itself is supplied by the embedder as an
//! implementation of [`DeviceExtractor`]. The engine walks the hierarchy
//! bottom-up, hands the extractor a per-cell view of the shape store, and
//! turns the returned [`RawDevice`]s into netlist devices. Terminal
//! geometry is kept aside and bound to nets once clusters exist.

use arcstr::ArcStr;
use diagnostics::LogSink;
use geometry::Shape;
use indexmap::IndexMap;
use netir::DeviceAbstract;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::layout::{Cell, CellId, DbShape, LayerId, Layout};
use crate::log::LogEntry;

/// A read-only view of one cell, handed to device extractors.
#[derive(Copy, Clone)]
pub struct DeviceCellView<'a> {
    layout: &'a Layout,
    cell: CellId,
}

impl<'a> DeviceCellView<'a> {
    pub(crate) fn new(layout: &'a Layout, cell: CellId) -> Self {
        Self { layout, cell }
    }

    /// The cell being inspected.
    #[inline]
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// The name of the cell.
    pub fn name(&self) -> &'a ArcStr {
        self.data().name()
    }

    /// The shapes of the cell on the given layer.
    pub fn shapes_on(&self, layer: LayerId) -> &'a [DbShape] {
        self.data().shapes_on(layer)
    }

    /// The whole shape store, for extractors that need to look further.
    #[inline]
    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    fn data(&self) -> &'a Cell {
        self.layout.cell(self.cell)
    }
}

/// The geometry of one device terminal, to be bound to a net during
/// netlist extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTerminal {
    /// The terminal role (e.g. `G`, `S`, `D`).
    pub role: ArcStr,
    /// The layer the terminal shape lives on.
    pub layer: LayerId,
    /// The terminal shape, in cell coordinates.
    pub shape: Shape,
}

/// One device recognized by a [`DeviceExtractor`].
#[derive(Clone, Debug)]
pub struct RawDevice {
    /// The device instance name.
    pub name: ArcStr,
    /// The device class (e.g. `NMOS`, `RES`).
    pub class: ArcStr,
    /// Numeric device parameters.
    pub params: IndexMap<ArcStr, Decimal>,
    /// Terminal geometry, bound to nets at netlist extraction time.
    pub terminals: Vec<RawTerminal>,
    /// Geometric footprints, for highlighting and net building.
    pub abstracts: Vec<DeviceAbstract>,
}

/// A device recognizer.
///
/// Implementations scan the shapes of a cell and report the devices they
/// find. Recognition failures are reported through the log sink, never as
/// hard errors: a malformed device configuration must not abort the run.
pub trait DeviceExtractor {
    /// The name of this extractor, used in diagnostics.
    fn name(&self) -> &str;

    /// The layer roles this extractor requires (e.g. `"gate"`, `"sd"`).
    ///
    /// The engine validates that the layer map supplied to
    /// [`extract_devices`](crate::LayoutToNetlist::extract_devices) covers
    /// every role before invoking the extractor.
    fn layer_roles(&self) -> &[&'static str];

    /// Recognizes the devices of one cell.
    fn extract(
        &mut self,
        cell: DeviceCellView<'_>,
        layers: &IndexMap<ArcStr, LayerId>,
        log: &mut dyn LogSink<LogEntry>,
    ) -> Vec<RawDevice>;
}
