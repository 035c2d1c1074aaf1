//! Error types for protocol encoding

use thiserror::Error;

/// Errors raised while encoding a request to wire bytes
///
/// All of these are parameter-validation failures and fire before any I/O
/// takes place. Decoding never errors; see [`crate::status`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Bin number outside the configured range
    #[error("bin {bin} out of range 1..={max}")]
    BinOutOfRange { bin: u8, max: u8 },

    /// Cart selector outside the addressable range
    #[error("cart selector {cart} out of range 1..={max}")]
    CartOutOfRange { cart: u8, max: u8 },

    /// Jog speed outside the accepted range
    #[error("jog speed {speed} out of range 0..={max}")]
    JogSpeedOutOfRange { speed: u8, max: u8 },
}
