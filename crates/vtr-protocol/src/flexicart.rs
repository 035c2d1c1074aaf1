//! FlexiCart Protocol Implementation
//!
//! FlexiCart cartridge robots speak a fixed 9-byte STX-framed protocol:
//!
//! # Frame Format
//! ```text
//! [STX] [byte-count] [unit-addr] [cart] [block] [cmd] [ctrl] [data] [checksum]
//! ```
//!
//! - `STX`: 0x02
//! - `byte-count`: always 0x06 (the six bytes between it and the checksum
//!   plus itself, per the vendor's odd counting)
//! - `unit-addr`: always 0x01 on a point-to-point link
//! - `cart`: cart selector, 1-based
//! - `block`: 0x20 for motion/control commands, 0x10 for sense commands
//! - `checksum`: two's complement of the sum of bytes 1..=7, so that bytes
//!   1..=8 sum to zero mod 256
//!
//! Structured responses are STX-framed and ETX-terminated; motion commands
//! answer with a single ACK/NAK/BUSY byte.

use crate::error::EncodeError;

/// Start-of-text framing byte
pub const STX: u8 = 0x02;
/// End-of-text terminator on structured responses
pub const ETX: u8 = 0x03;
/// Fixed command frame length
pub const FRAME_LEN: usize = 9;
/// Fixed byte-count field value
pub const BYTE_COUNT: u8 = 0x06;
/// Unit address on a point-to-point link
pub const UNIT_ADDR: u8 = 0x01;
/// Highest addressable cart selector
pub const MAX_CART: u8 = 8;
/// Default bin complement of a full-height cart
pub const DEFAULT_BIN_COUNT: u8 = 80;

/// Command block selectors
mod block {
    /// Motion and control commands
    pub const CONTROL: u8 = 0x20;
    /// Status sense commands
    pub const SENSE: u8 = 0x10;
}

/// FlexiCart commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlexiCartCommand {
    /// Move the elevator to the given bin and load its cassette
    MoveToBin { bin: u8 },
    /// Request the bin occupancy summary
    BinStatusSense,
    /// Request the cart transport status block
    CartStatusSense,
    /// Request the pending error codes
    ErrorSense,
    /// Run the elevator calibration cycle (long-running)
    Calibrate,
}

impl FlexiCartCommand {
    /// Human-readable command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            FlexiCartCommand::MoveToBin { .. } => "move to bin",
            FlexiCartCommand::BinStatusSense => "bin status sense",
            FlexiCartCommand::CartStatusSense => "cart status sense",
            FlexiCartCommand::ErrorSense => "error sense",
            FlexiCartCommand::Calibrate => "calibrate",
        }
    }

    /// (block, cmd, ctrl, data) quad for this command
    fn fields(&self) -> (u8, u8, u8, u8) {
        match self {
            FlexiCartCommand::MoveToBin { bin } => (block::CONTROL, 0x10, *bin, 0x80),
            FlexiCartCommand::BinStatusSense => (block::SENSE, 0x31, 0x00, 0x00),
            FlexiCartCommand::CartStatusSense => (block::SENSE, 0x20, 0x00, 0x00),
            FlexiCartCommand::ErrorSense => (block::SENSE, 0x60, 0x00, 0x00),
            FlexiCartCommand::Calibrate => (block::CONTROL, 0x50, 0x00, 0x80),
        }
    }

    /// Whether this command answers with an STX/ETX structured frame
    pub fn structured_reply(&self) -> bool {
        matches!(
            self,
            FlexiCartCommand::BinStatusSense
                | FlexiCartCommand::CartStatusSense
                | FlexiCartCommand::ErrorSense
        )
    }

    /// Whether this command needs the long response window
    ///
    /// Calibration drives the elevator through its full travel and can take
    /// tens of seconds to acknowledge.
    pub fn long_running(&self) -> bool {
        matches!(self, FlexiCartCommand::Calibrate)
    }

    /// Encode this command to its fixed 9-byte frame
    ///
    /// `bin_count` is the configured slot complement of the target cart; bin
    /// and cart selectors are validated here, before any I/O.
    pub fn encode(&self, cart: u8, bin_count: u8) -> Result<[u8; FRAME_LEN], EncodeError> {
        if cart == 0 || cart > MAX_CART {
            return Err(EncodeError::CartOutOfRange {
                cart,
                max: MAX_CART,
            });
        }
        if let FlexiCartCommand::MoveToBin { bin } = self {
            if *bin == 0 || *bin > bin_count {
                return Err(EncodeError::BinOutOfRange {
                    bin: *bin,
                    max: bin_count,
                });
            }
        }

        let (block, cmd, ctrl, data) = self.fields();
        let mut frame = [STX, BYTE_COUNT, UNIT_ADDR, cart, block, cmd, ctrl, data, 0];
        frame[8] = checksum(&frame[1..8]);
        Ok(frame)
    }
}

/// Two's-complement checksum over the given bytes
///
/// Chosen so that appending it makes the covered range plus checksum sum to
/// zero mod 256.
pub fn checksum(payload: &[u8]) -> u8 {
    let sum = payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    (0x100 - sum as u16) as u8
}

/// One cassette storage position in a cart
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CassetteBin {
    /// 1-based slot number
    pub slot: u8,
    /// Whether a cassette is present
    pub occupied: bool,
    /// Operator-assigned cassette label, if any
    pub label: Option<String>,
}

/// Decoded bin occupancy summary
///
/// The protocol reports only a (total, occupied) count pair, so slots
/// 1..=occupied are marked occupied in index order. This is a coarse
/// approximation inherited from the wire format: it says how many bins hold
/// a cassette, not which ones.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinStatus {
    /// Total slot count reported by the cart
    pub total: u8,
    /// Per-slot occupancy, slots 1..=total
    pub bins: Vec<CassetteBin>,
}

impl BinStatus {
    /// Number of occupied slots
    pub fn occupied_count(&self) -> usize {
        self.bins.iter().filter(|b| b.occupied).count()
    }
}

/// In-memory bin inventory for one cart
///
/// Slot count is fixed at construction. Mutated only by explicit set/remove
/// or by applying a scan result wholesale; nothing here persists.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinMap {
    bins: Vec<CassetteBin>,
}

impl BinMap {
    /// Create an empty map with a fixed slot count
    pub fn new(total: u8) -> Self {
        let bins = (1..=total)
            .map(|slot| CassetteBin {
                slot,
                occupied: false,
                label: None,
            })
            .collect();
        Self { bins }
    }

    /// Total slot count
    pub fn total(&self) -> u8 {
        self.bins.len() as u8
    }

    /// Look up a slot (1-based)
    pub fn get(&self, slot: u8) -> Option<&CassetteBin> {
        self.bins.get(slot.checked_sub(1)? as usize)
    }

    /// Mark a slot occupied, with an optional cassette label
    pub fn set(&mut self, slot: u8, label: Option<String>) -> Result<(), EncodeError> {
        let max = self.total();
        let bin = slot
            .checked_sub(1)
            .and_then(|i| self.bins.get_mut(i as usize))
            .ok_or(EncodeError::BinOutOfRange { bin: slot, max })?;
        bin.occupied = true;
        bin.label = label;
        Ok(())
    }

    /// Mark a slot empty and drop its label
    pub fn remove(&mut self, slot: u8) -> Result<(), EncodeError> {
        let max = self.total();
        let bin = slot
            .checked_sub(1)
            .and_then(|i| self.bins.get_mut(i as usize))
            .ok_or(EncodeError::BinOutOfRange { bin: slot, max })?;
        bin.occupied = false;
        bin.label = None;
        Ok(())
    }

    /// Replace occupancy wholesale from a decoded scan result
    ///
    /// Labels survive on slots that stay occupied; slot count does not
    /// change even if the cart reports a different total.
    pub fn apply(&mut self, status: &BinStatus) {
        for bin in &mut self.bins {
            let occupied = status
                .bins
                .iter()
                .find(|b| b.slot == bin.slot)
                .map(|b| b.occupied)
                .unwrap_or(false);
            bin.occupied = occupied;
            if !occupied {
                bin.label = None;
            }
        }
    }

    /// Iterate all slots in order
    pub fn iter(&self) -> impl Iterator<Item = &CassetteBin> {
        self.bins.iter()
    }
}
