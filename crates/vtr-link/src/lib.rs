//! Broadcast Deck Link Layer
//!
//! This crate owns the serial side of deck control: exclusive channels over
//! point-to-point links, the timeout-governed write-then-collect exchange,
//! the channel registry, and the request engine that ties them to the pure
//! protocol layer in `vtr-protocol`.
//!
//! # Architecture
//!
//! - [`channel`]: one exclusively-owned serial link; [`Channel::exchange`]
//!   is the sole I/O primitive and serializes strictly per channel.
//! - [`collector`]: the exchange policy (inactivity timer, terminator,
//!   expected length) with partial responses treated as degraded success,
//!   never failure.
//! - [`registry`]: logical channel id -> live channel, idempotent
//!   last-write registration.
//! - [`engine`]: `submit_request` for callers; picks the per-command policy
//!   and decodes the response.
//!
//! The two-tier timeout policy (short open window, longer response window,
//! graceful partials) is deliberate: it is what lets a scanner tell "no
//! device" from "device silent" from "device responding".
//!
//! # Example
//!
//! ```rust,no_run
//! use vtr_link::{ChannelConfig, DeckEngine};
//! use vtr_protocol::{DeckRequest, SonyCommand};
//!
//! # async fn demo() -> Result<(), vtr_link::LinkError> {
//! let engine = DeckEngine::new();
//! engine.register_channel("vtr-1", ChannelConfig::new("/dev/ttyUSB0")).await?;
//!
//! let outcome = engine
//!     .submit_request("vtr-1", DeckRequest::Deck(SonyCommand::StatusSense))
//!     .await?;
//! println!("decoded: {:?} (partial: {})", outcome.reply, outcome.partial);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod collector;
pub mod engine;
pub mod error;
pub mod registry;

pub use channel::{Channel, ChannelConfig, DataBits, Parity, SerialChannel, StopBits};
pub use collector::{Completion, ExchangePolicy, Reply};
pub use engine::{DeckEngine, EngineConfig, RequestOutcome};
pub use error::LinkError;
pub use registry::ChannelRegistry;
