//! Extraction log entries.

use std::fmt::Display;

use arcstr::ArcStr;
use diagnostics::{Diagnostic, Severity};
use geometry::Shape;
use serde::{Deserialize, Serialize};

use crate::layout::CellId;

/// One diagnostic record produced during extraction.
///
/// Entries are collected in the engine's [`Journal`](diagnostics::Journal);
/// error-severity entries become fatal only when the caller invokes
/// [`check_extraction_errors`](crate::LayoutToNetlist::check_extraction_errors).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    severity: Severity,
    message: ArcStr,
    category: Option<ArcStr>,
    cell: Option<CellId>,
    geometry: Option<Shape>,
}

impl LogEntry {
    /// Creates an info-severity entry.
    pub fn info(message: impl Into<ArcStr>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Creates a warning-severity entry.
    pub fn warning(message: impl Into<ArcStr>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Creates an error-severity entry.
    pub fn error(message: impl Into<ArcStr>) -> Self {
        Self::new(Severity::Error, message)
    }

    fn new(severity: Severity, message: impl Into<ArcStr>) -> Self {
        Self {
            severity,
            message: message.into(),
            category: None,
            cell: None,
            geometry: None,
        }
    }

    /// Attaches the cell the entry refers to.
    pub fn with_cell(mut self, cell: CellId) -> Self {
        self.cell = Some(cell);
        self
    }

    /// Attaches the geometry the entry refers to.
    pub fn with_geometry(mut self, geometry: Shape) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Attaches a category tag (typically the reporting subsystem).
    pub fn with_category(mut self, category: impl Into<ArcStr>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The message text.
    #[inline]
    pub fn message(&self) -> &ArcStr {
        &self.message
    }

    /// The cell the entry refers to, if any.
    #[inline]
    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    /// The geometry the entry refers to, if any.
    #[inline]
    pub fn geometry(&self) -> Option<&Shape> {
        self.geometry.as_ref()
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(category) = &self.category {
            write!(f, " [{}]", category)?;
        }
        if let Some(cell) = self.cell {
            write!(f, " (in {})", cell)?;
        }
        Ok(())
    }
}

impl Diagnostic for LogEntry {
    fn severity(&self) -> Severity {
        self.severity
    }
}
