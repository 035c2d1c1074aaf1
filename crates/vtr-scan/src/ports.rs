//! Serial port enumeration
//!
//! Turns the host's serial port list into candidate channel configs for the
//! scanner, with the Sony 9-pin line discipline preset.

use serialport::available_ports;
use tracing::info;

use vtr_link::ChannelConfig;

use crate::error::ScanError;

/// Filter applied to enumerated ports
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PortFilter {
    /// Skip ports whose name contains any of these patterns
    pub skip_patterns: Vec<String>,
}

impl Default for PortFilter {
    fn default() -> Self {
        Self {
            skip_patterns: vec![
                // Bluetooth ports on macOS
                "Bluetooth".to_string(),
                // Debug/logging ports
                "debug".to_string(),
            ],
        }
    }
}

impl PortFilter {
    fn keeps(&self, name: &str) -> bool {
        !self.skip_patterns.iter().any(|p| name.contains(p))
    }
}

/// Enumerate host serial ports as candidate channel configs
pub fn enumerate_candidates(filter: &PortFilter) -> Result<Vec<ChannelConfig>, ScanError> {
    let ports = available_ports().map_err(|e| ScanError::EnumerationFailed(e.to_string()))?;

    let candidates: Vec<ChannelConfig> = ports
        .into_iter()
        .filter(|p| filter.keeps(&p.port_name))
        .map(|p| ChannelConfig::new(p.port_name))
        .collect();

    if candidates.is_empty() {
        info!("no candidate serial ports found");
    } else {
        info!(count = candidates.len(), "found candidate serial ports");
    }

    Ok(candidates)
}
