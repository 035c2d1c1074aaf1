//! Channel discovery for broadcast decks
//!
//! Enumerates host serial ports and probes each candidate in turn with a
//! short status request, compiling an inventory of responding devices and a
//! diagnosis for each candidate that failed.
//!
//! ```no_run
//! use vtr_scan::{enumerate_candidates, ChannelScanner, PortFilter};
//!
//! # async fn run() -> Result<(), vtr_scan::ScanError> {
//! let candidates = enumerate_candidates(&PortFilter::default())?;
//! let report = ChannelScanner::new().scan(&candidates).await;
//! for (id, status) in report.inventory() {
//!     println!("{id}: {:?}", status.mode);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ports;
pub mod probe;

pub use error::ScanError;
pub use ports::{enumerate_candidates, PortFilter};
pub use probe::{ChannelDiagnosis, ChannelScanner, InventoryReport, ProbeRecord, ScanConfig};
