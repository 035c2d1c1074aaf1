//! Broadcast Deck Protocol Library
//!
//! This crate provides frame encoding and response decoding for the two
//! vendor protocols spoken by professional broadcast tape hardware:
//!
//! - **Sony 9-pin**: 2-6 byte binary commands from a fixed table, addressed
//!   to videotape recorders over RS-422. Sense commands carry a trailing sum
//!   checksum; the legacy transport commands do not.
//! - **FlexiCart**: fixed 9-byte STX-framed commands addressed to
//!   cartridge-handling robots, with a complement checksum that makes bytes
//!   1..=8 sum to zero mod 256.
//!
//! Everything in this crate is pure: encoding is request -> bytes (rejecting
//! bad parameters before any I/O happens), decoding is bytes -> semantic
//! status and never fails. Malformed or undersized responses decode to
//! defined defaults (mode UNKNOWN, status code 0xFF) rather than errors,
//! because half-documented hardware answers in fragments more often than not.
//!
//! # Example
//!
//! ```rust
//! use vtr_protocol::flexicart::FlexiCartCommand;
//! use vtr_protocol::status::{decode_mode, TransportMode};
//!
//! // Encode "move cassette to bin 7" for cart 1
//! let frame = FlexiCartCommand::MoveToBin { bin: 7 }.encode(1, 80).unwrap();
//! assert_eq!(frame.iter().skip(1).map(|&b| b as u32).sum::<u32>() % 256, 0);
//!
//! // Decode a transport status response
//! assert_eq!(decode_mode(&[0xF7, 0x7E, 0x00]), TransportMode::Stop);
//! ```

pub mod command;
pub mod error;
pub mod flexicart;
pub mod models;
pub mod sony;
pub mod status;

pub use command::{DeckReply, DeckRequest};
pub use error::EncodeError;
pub use flexicart::{BinMap, BinStatus, CassetteBin, FlexiCartCommand};
pub use models::{DeckDatabase, DeckModel};
pub use sony::SonyCommand;
pub use status::{DeviceStatus, ReplyClass, TransportMode};

/// Identifies which vendor protocol a channel speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Protocol {
    /// Sony 9-pin VTR transport/status protocol (RS-422)
    SonyNinePin,
    /// FlexiCart STX-framed cartridge robot protocol
    FlexiCart,
}

impl Protocol {
    /// Returns a human-readable name for the protocol
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::SonyNinePin => "Sony 9-pin",
            Protocol::FlexiCart => "FlexiCart",
        }
    }
}
