//! Sony 9-pin Protocol Implementation
//!
//! The Sony 9-pin protocol (also called RS-422 deck control) uses short
//! binary commands from a fixed table. The first byte selects a command
//! block, the second the operation; sense commands append data bytes.
//!
//! # Command Format
//! ```text
//! [block] [op] [data...] ([checksum])
//! ```
//!
//! The trailing checksum is the sum of all preceding bytes mod 256, but only
//! the sense/status command family carries it. The legacy transport commands
//! (play, stop, wind, jog) are sent bare, and the codec supports both
//! encoding modes selected per command.

use crate::error::EncodeError;

/// Maximum jog speed parameter accepted by the transport
pub const MAX_JOG_SPEED: u8 = 0x7F;

/// Whether a command carries a trailing checksum byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumMode {
    /// No checksum appended (legacy transport commands)
    None,
    /// Trailing byte = sum of all preceding bytes mod 256
    Sum,
}

/// Sony 9-pin commands from the fixed vendor table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SonyCommand {
    /// Ask the deck to identify itself (two-byte device type response)
    DeviceTypeRequest,
    /// Stop the transport
    Stop,
    /// Play at normal speed
    Play,
    /// Fast-forward wind
    FastForward,
    /// Rewind wind
    Rewind,
    /// Eject the loaded cassette
    Eject,
    /// Thread the tape and hold ready
    StandbyOn,
    /// Release standby
    StandbyOff,
    /// Jog forward at the given speed parameter
    JogForward { speed: u8 },
    /// Jog reverse at the given speed parameter
    JogReverse { speed: u8 },
    /// Request the transport/status data block
    StatusSense,
    /// Request the current timecode (BCD)
    TimecodeSense,
}

impl SonyCommand {
    /// Human-readable command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SonyCommand::DeviceTypeRequest => "device type request",
            SonyCommand::Stop => "stop",
            SonyCommand::Play => "play",
            SonyCommand::FastForward => "fast forward",
            SonyCommand::Rewind => "rewind",
            SonyCommand::Eject => "eject",
            SonyCommand::StandbyOn => "standby on",
            SonyCommand::StandbyOff => "standby off",
            SonyCommand::JogForward { .. } => "jog forward",
            SonyCommand::JogReverse { .. } => "jog reverse",
            SonyCommand::StatusSense => "status sense",
            SonyCommand::TimecodeSense => "timecode sense",
        }
    }

    /// Command body from the fixed table, before any checksum
    fn body(&self) -> Vec<u8> {
        match self {
            SonyCommand::DeviceTypeRequest => vec![0x00, 0x11],
            SonyCommand::Stop => vec![0x20, 0x00],
            SonyCommand::Play => vec![0x20, 0x01],
            SonyCommand::FastForward => vec![0x20, 0x10],
            SonyCommand::Rewind => vec![0x20, 0x20],
            SonyCommand::Eject => vec![0x20, 0x0F],
            SonyCommand::StandbyOn => vec![0x20, 0x05],
            SonyCommand::StandbyOff => vec![0x20, 0x04],
            SonyCommand::JogForward { speed } => vec![0x21, 0x11, *speed],
            SonyCommand::JogReverse { speed } => vec![0x21, 0x21, *speed],
            SonyCommand::StatusSense => vec![0x61, 0x20, 0x0F],
            SonyCommand::TimecodeSense => vec![0x61, 0x0C, 0x03],
        }
    }

    /// Checksum mode for this command
    ///
    /// Sense commands (block 0x61) and device type request are checksummed;
    /// the legacy transport blocks (0x20/0x21) are not.
    pub fn checksum_mode(&self) -> ChecksumMode {
        match self {
            SonyCommand::DeviceTypeRequest
            | SonyCommand::StatusSense
            | SonyCommand::TimecodeSense => ChecksumMode::Sum,
            _ => ChecksumMode::None,
        }
    }

    /// Expected fixed response length, where the protocol defines one
    ///
    /// Used by the response collector to end an exchange early instead of
    /// waiting out the inactivity timer.
    pub fn expected_reply_len(&self) -> Option<usize> {
        match self {
            SonyCommand::DeviceTypeRequest => Some(3),
            SonyCommand::StatusSense => Some(5),
            SonyCommand::TimecodeSense => Some(5),
            // Transport commands answer with a single ACK/NAK byte
            _ => Some(1),
        }
    }

    /// Encode this command to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if let SonyCommand::JogForward { speed } | SonyCommand::JogReverse { speed } = self {
            if *speed > MAX_JOG_SPEED {
                return Err(EncodeError::JogSpeedOutOfRange {
                    speed: *speed,
                    max: MAX_JOG_SPEED,
                });
            }
        }

        let mut bytes = self.body();
        if self.checksum_mode() == ChecksumMode::Sum {
            let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            bytes.push(sum);
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_commands_have_no_checksum() {
        assert_eq!(SonyCommand::Play.encode().unwrap(), vec![0x20, 0x01]);
        assert_eq!(SonyCommand::Stop.encode().unwrap(), vec![0x20, 0x00]);
        assert_eq!(SonyCommand::Rewind.encode().unwrap(), vec![0x20, 0x20]);
    }

    #[test]
    fn test_sense_commands_carry_sum_checksum() {
        let bytes = SonyCommand::StatusSense.encode().unwrap();
        assert_eq!(bytes, vec![0x61, 0x20, 0x0F, 0x90]);

        let bytes = SonyCommand::DeviceTypeRequest.encode().unwrap();
        assert_eq!(bytes, vec![0x00, 0x11, 0x11]);
    }

    #[test]
    fn test_checksum_is_sum_of_preceding_bytes() {
        for cmd in [
            SonyCommand::DeviceTypeRequest,
            SonyCommand::StatusSense,
            SonyCommand::TimecodeSense,
        ] {
            let bytes = cmd.encode().unwrap();
            let (body, cksum) = bytes.split_at(bytes.len() - 1);
            let sum = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            assert_eq!(cksum[0], sum, "{:?}", cmd);
        }
    }

    #[test]
    fn test_jog_speed_encoded_in_data_byte() {
        let bytes = SonyCommand::JogForward { speed: 0x20 }.encode().unwrap();
        assert_eq!(bytes, vec![0x21, 0x11, 0x20]);

        let bytes = SonyCommand::JogReverse { speed: 0x05 }.encode().unwrap();
        assert_eq!(bytes, vec![0x21, 0x21, 0x05]);
    }

    #[test]
    fn test_jog_speed_out_of_range_rejected() {
        let err = SonyCommand::JogForward { speed: 0x80 }.encode().unwrap_err();
        assert_eq!(
            err,
            EncodeError::JogSpeedOutOfRange {
                speed: 0x80,
                max: MAX_JOG_SPEED
            }
        );
    }

    #[test]
    fn test_frame_lengths_within_table_bounds() {
        let all = [
            SonyCommand::DeviceTypeRequest,
            SonyCommand::Stop,
            SonyCommand::Play,
            SonyCommand::FastForward,
            SonyCommand::Rewind,
            SonyCommand::Eject,
            SonyCommand::StandbyOn,
            SonyCommand::StandbyOff,
            SonyCommand::JogForward { speed: 1 },
            SonyCommand::JogReverse { speed: 1 },
            SonyCommand::StatusSense,
            SonyCommand::TimecodeSense,
        ];
        for cmd in all {
            let len = cmd.encode().unwrap().len();
            assert!((2..=6).contains(&len), "{:?} encoded to {} bytes", cmd, len);
        }
    }
}
