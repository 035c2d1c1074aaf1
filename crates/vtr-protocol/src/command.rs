//! Normalized request and reply types
//!
//! Surrounding application code (gateways, CLIs) speaks these semantic types;
//! the per-protocol modules own the byte-level encodings.

use crate::error::EncodeError;
use crate::flexicart::{BinStatus, FlexiCartCommand};
use crate::models::DeckModel;
use crate::sony::SonyCommand;
use crate::status::DeviceStatus;
use crate::Protocol;

/// A semantic request addressed to one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeckRequest {
    /// Sony 9-pin command to a VTR
    Deck(SonyCommand),
    /// FlexiCart command to a cartridge robot
    Cart {
        /// Cart selector, 1-based
        cart: u8,
        /// The command itself
        command: FlexiCartCommand,
    },
}

impl DeckRequest {
    /// Human-readable command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            DeckRequest::Deck(cmd) => cmd.name(),
            DeckRequest::Cart { command, .. } => command.name(),
        }
    }

    /// The vendor protocol this request is encoded in
    pub fn protocol(&self) -> Protocol {
        match self {
            DeckRequest::Deck(_) => Protocol::SonyNinePin,
            DeckRequest::Cart { .. } => Protocol::FlexiCart,
        }
    }

    /// Encode to wire bytes, validating parameters first
    ///
    /// `bin_count` is the configured slot complement for cart-addressed
    /// requests and is ignored for deck requests.
    pub fn encode(&self, bin_count: u8) -> Result<Vec<u8>, EncodeError> {
        match self {
            DeckRequest::Deck(cmd) => cmd.encode(),
            DeckRequest::Cart { cart, command } => {
                command.encode(*cart, bin_count).map(|f| f.to_vec())
            }
        }
    }
}

/// The decoded semantic content of a response
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeckReply {
    /// Decoded device status block
    Status(DeviceStatus),
    /// Decoded bin occupancy summary
    Bins(BinStatus),
    /// Decoded timecode, "HH:MM:SS:FF"
    Timecode(String),
    /// Device identification, best-effort model lookup
    Model {
        /// Raw two-byte device type, if the response carried one
        device_type: Option<(u8, u8)>,
        /// Matched model, if the type is in the database
        model: Option<DeckModel>,
    },
    /// Command accepted (ACK)
    Ack,
    /// Command rejected (NAK)
    Nak,
    /// Device mid-operation, try again (BUSY)
    Deferred,
    /// Response did not fit any known shape; raw bytes are on the outcome
    Raw,
}
