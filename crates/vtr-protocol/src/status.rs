//! Status Interpretation
//!
//! Total, side-effect-free mappings from raw response bytes (plus the command
//! that produced them) to semantic records. Nothing in this module panics or
//! errors: malformed and undersized input decodes to defined defaults (mode
//! UNKNOWN, status code 0xFF).
//!
//! Several decodings here are heuristic approximations of an incompletely
//! documented protocol and are deliberately preserved as such, notably the
//! bin-occupancy count pair and the transport-mode prefix table. Do not
//! "correct" them without new protocol documentation.

use tracing::trace;

use crate::command::{DeckReply, DeckRequest};
use crate::flexicart::{self, BinStatus, CassetteBin, FlexiCartCommand};
use crate::models::DeckDatabase;
use crate::sony::SonyCommand;

/// Command accepted
pub const ACK: u8 = 0x04;
/// Command rejected
pub const NAK: u8 = 0x05;
/// Device mid-operation, command deferred
pub const BUSY: u8 = 0x06;

/// Status code reported for responses too short to carry one
pub const UNKNOWN_STATUS_CODE: u8 = 0xFF;

/// Byte whose presence reclassifies a jog-forward status as jog-still
///
/// Both physical states share the leading 0x6F 0x77 pattern; the 0x3E marker
/// anywhere in the block is the only observed difference.
pub const JOG_STILL_MARKER: u8 = 0x3E;

/// Physical tape-motion state of a VTR transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportMode {
    Stop,
    Play,
    FastForward,
    Rewind,
    JogForward,
    JogReverse,
    JogStill,
    Unknown,
}

impl TransportMode {
    /// Human-readable mode name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Stop => "stop",
            TransportMode::Play => "play",
            TransportMode::FastForward => "fast forward",
            TransportMode::Rewind => "rewind",
            TransportMode::JogForward => "jog forward",
            TransportMode::JogReverse => "jog reverse",
            TransportMode::JogStill => "jog still",
            TransportMode::Unknown => "unknown",
        }
    }
}

/// Ordered mode prefix table; first exact-prefix match wins
///
/// Prefixes are lowercase hex of the leading response bytes. Order matters
/// and is part of the observed device behavior.
const MODE_PREFIXES: &[(&str, TransportMode)] = &[
    ("f77e", TransportMode::Stop),
    ("d7bd", TransportMode::Play),
    ("ddbd", TransportMode::FastForward),
    ("bbbd", TransportMode::Rewind),
    ("6f77", TransportMode::JogForward),
    ("6f76", TransportMode::JogReverse),
];

/// Lowercase hex rendering of a raw response
pub fn to_hex(raw: &[u8]) -> String {
    raw.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decode the transport mode from a status response
///
/// Matches the response's leading bytes against the fixed prefix table.
/// A jog-forward match is reclassified as jog-still when the response
/// contains [`JOG_STILL_MARKER`] anywhere; the two states share a leading
/// pattern and this two-level check is the only way to tell them apart.
pub fn decode_mode(raw: &[u8]) -> TransportMode {
    let hex = to_hex(raw);
    for (prefix, mode) in MODE_PREFIXES {
        if hex.starts_with(prefix) {
            if *mode == TransportMode::JogForward && raw.contains(&JOG_STILL_MARKER) {
                return TransportMode::JogStill;
            }
            return *mode;
        }
    }
    TransportMode::Unknown
}

/// Decode tape presence: bit 0 of byte 1, valid only when len >= 3
pub fn decode_tape_present(raw: &[u8]) -> Option<bool> {
    if raw.len() >= 3 {
        Some(raw[1] & 0x01 != 0)
    } else {
        None
    }
}

/// Decode a BCD timecode response to "HH:MM:SS:FF"
///
/// Layout: [header] [frames] [seconds] [minutes] [hours], all BCD.
/// Undersized input decodes to the zero timecode.
pub fn decode_timecode(raw: &[u8]) -> String {
    fn bcd(b: u8) -> u8 {
        (b >> 4) * 10 + (b & 0x0F)
    }
    if raw.len() < 5 {
        return "00:00:00:00".to_string();
    }
    format!(
        "{:02}:{:02}:{:02}:{:02}",
        bcd(raw[4]),
        bcd(raw[3]),
        bcd(raw[2]),
        bcd(raw[1])
    )
}

/// Shape classification of a raw response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// Zero-length: no reply at all
    Empty,
    /// Single ACK byte
    Ack,
    /// Single NAK byte
    Nak,
    /// Single BUSY byte
    DeviceBusy,
    /// STX-framed structured response
    Structured,
    /// Anything else; decoded best-effort or passed through raw
    Opaque,
}

/// Classify a raw response by leading byte and length
pub fn classify(raw: &[u8]) -> ReplyClass {
    match raw {
        [] => ReplyClass::Empty,
        [ACK] => ReplyClass::Ack,
        [NAK] => ReplyClass::Nak,
        [BUSY] => ReplyClass::DeviceBusy,
        [flexicart::STX, ..] => ReplyClass::Structured,
        _ => ReplyClass::Opaque,
    }
}

/// Fixed error code table; unmapped codes fall through to the caller
fn error_name(code: u8) -> Option<&'static str> {
    match code {
        0x01 => Some("bin empty"),
        0x02 => Some("cassette jam"),
        0x03 => Some("door open"),
        0x04 => Some("elevator fault"),
        0x05 => Some("barcode read failure"),
        0x06 => Some("cassette not seated"),
        0x10 => Some("transport servo fault"),
        0x11 => Some("tape threading fault"),
        0x20 => Some("communication framing error"),
        _ => None,
    }
}

/// Decode the error list from an error-status response
///
/// Every non-zero byte strictly between the first and last byte is one error
/// code; unmapped codes render as "unknown error 0xNN" rather than being
/// dropped.
pub fn decode_errors(raw: &[u8]) -> Vec<String> {
    if raw.len() < 3 {
        return Vec::new();
    }
    raw[1..raw.len() - 1]
        .iter()
        .filter(|&&b| b != 0)
        .map(|&code| match error_name(code) {
            Some(name) => name.to_string(),
            None => format!("unknown error 0x{:02X}", code),
        })
        .collect()
}

/// Semantic device status, produced fresh per probe
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceStatus {
    /// Transport motion state
    pub mode: TransportMode,
    /// Tape presence; `None` when the response is too short to say
    pub tape_present: Option<bool>,
    /// Decoded error list (error-sense responses only)
    pub errors: Vec<String>,
    /// Timecode "HH:MM:SS:FF", empty when the response carries none
    pub timecode: String,
    /// Leading status byte, 0xFF for empty responses
    pub status_code: u8,
    /// Lowercase hex of the raw response
    pub raw_hex: String,
}

impl DeviceStatus {
    /// The defined default for responses that fit no known shape
    pub fn unknown() -> Self {
        Self {
            mode: TransportMode::Unknown,
            tape_present: None,
            errors: Vec::new(),
            timecode: String::new(),
            status_code: UNKNOWN_STATUS_CODE,
            raw_hex: String::new(),
        }
    }
}

/// Decode a status-sense response into a [`DeviceStatus`]
pub fn decode_device_status(raw: &[u8]) -> DeviceStatus {
    let status = DeviceStatus {
        mode: decode_mode(raw),
        tape_present: decode_tape_present(raw),
        errors: Vec::new(),
        timecode: String::new(),
        status_code: raw.first().copied().unwrap_or(UNKNOWN_STATUS_CODE),
        raw_hex: to_hex(raw),
    };
    trace!(mode = status.mode.as_str(), raw = %status.raw_hex, "decoded device status");
    status
}

/// Decode an error-sense response into a [`DeviceStatus`] carrying the errors
pub fn decode_error_status(raw: &[u8]) -> DeviceStatus {
    DeviceStatus {
        errors: decode_errors(raw),
        ..decode_device_status(raw)
    }
}

/// Decode a bin-status response
///
/// Byte 1 is the total slot count, byte 2 the occupied count; slots
/// 1..=occupied are marked occupied in index order. A count-pair
/// approximation of the real protocol, preserved as-is.
pub fn decode_bin_status(raw: &[u8]) -> BinStatus {
    if raw.len() < 3 {
        return BinStatus {
            total: 0,
            bins: Vec::new(),
        };
    }
    let total = raw[1];
    let occupied = raw[2].min(total);
    let bins = (1..=total)
        .map(|slot| CassetteBin {
            slot,
            occupied: slot <= occupied,
            label: None,
        })
        .collect();
    BinStatus { total, bins }
}

/// Interpret a raw response in the context of the request that produced it
///
/// Total: every (request, bytes) pair maps to some [`DeckReply`], falling
/// back to `Raw` for shapes that fit nothing known.
pub fn interpret(request: &DeckRequest, raw: &[u8]) -> DeckReply {
    match request {
        DeckRequest::Deck(cmd) => match cmd {
            SonyCommand::StatusSense => DeckReply::Status(decode_device_status(raw)),
            SonyCommand::TimecodeSense => DeckReply::Timecode(decode_timecode(raw)),
            SonyCommand::DeviceTypeRequest => {
                let device_type = if raw.len() >= 2 {
                    Some((raw[0], raw[1]))
                } else {
                    None
                };
                DeckReply::Model {
                    device_type,
                    model: device_type.and_then(|(b0, b1)| DeckDatabase::by_device_type(b0, b1)),
                }
            }
            _ => classify_control_reply(raw),
        },
        DeckRequest::Cart { command, .. } => match command {
            FlexiCartCommand::BinStatusSense => DeckReply::Bins(decode_bin_status(raw)),
            FlexiCartCommand::CartStatusSense => DeckReply::Status(decode_device_status(raw)),
            FlexiCartCommand::ErrorSense => DeckReply::Status(decode_error_status(raw)),
            FlexiCartCommand::MoveToBin { .. } | FlexiCartCommand::Calibrate => {
                classify_control_reply(raw)
            }
        },
    }
}

/// Map a control-command reply through the ACK/NAK/BUSY classification
fn classify_control_reply(raw: &[u8]) -> DeckReply {
    match classify(raw) {
        ReplyClass::Ack => DeckReply::Ack,
        ReplyClass::Nak => DeckReply::Nak,
        ReplyClass::DeviceBusy => DeckReply::Deferred,
        _ => DeckReply::Raw,
    }
}
