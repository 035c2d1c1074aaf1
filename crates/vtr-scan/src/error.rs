//! Error types for channel discovery

use thiserror::Error;

/// Errors that can occur while discovering channels
///
/// Per-candidate probe failures are not errors; they are recorded in the
/// [`crate::probe::InventoryReport`] and scanning continues.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The host refused to enumerate its serial ports
    #[error("port enumeration failed: {0}")]
    EnumerationFailed(String),
}
