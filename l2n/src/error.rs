//! Error types and error handling utilities.

use std::path::PathBuf;

/// A result type returning extraction errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type for extraction operations.
///
/// Configuration and resource errors fail synchronously at the call that
/// introduced them. Extraction-time diagnostics are buffered in the log
/// journal instead and only surface through
/// [`check_extraction_errors`](crate::LayoutToNetlist::check_extraction_errors),
/// which produces [`Error::Extraction`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An invalid configuration value (thread count, area ratio, ...).
    #[error("invalid configuration: {0}")]
    Config(String),
    /// An invalid argument to an extraction call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The source layout has no layer with the given index.
    #[error("no layer with index {0} in the source layout")]
    InvalidLayerIndex(u32),
    /// No hierarchical layout (top cell) is available.
    #[error("no layout loaded")]
    NoLayout,
    /// No hierarchical shape store is configured, or the shared store is gone.
    #[error("no shape store configured")]
    NoShapeStore,
    /// Accumulated extraction diagnostics promoted to a hard failure.
    #[error("extraction produced errors:\n{0}")]
    Extraction(String),
    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// The file is not a recognized extraction database.
    #[error("unrecognized database format in {0}")]
    UnknownFormat(PathBuf),
}
