//! Request engine
//!
//! The interface surrounding application code (gateways, CLIs, shells)
//! consumes: register a channel, submit a semantic request against it, get a
//! decoded outcome or a typed error back. Encoding, the exchange itself and
//! interpretation all live below this module; the engine only wires them
//! together and owns the per-command timeout policy.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vtr_protocol::flexicart::{self, DEFAULT_BIN_COUNT};
use vtr_protocol::status;
use vtr_protocol::{DeckReply, DeckRequest};

use crate::channel::{Channel, ChannelConfig, SerialChannel};
use crate::collector::{ExchangePolicy, DEFAULT_RESPONSE_TIMEOUT, LONG_RESPONSE_TIMEOUT};
use crate::error::LinkError;
use crate::registry::ChannelRegistry;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    /// Inactivity window for ordinary commands (ms)
    pub response_timeout_ms: u64,
    /// Inactivity window for long-running commands such as calibration (ms)
    pub long_response_timeout_ms: u64,
    /// Configured slot complement for cart-addressed requests
    pub bin_count: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT.as_millis() as u64,
            long_response_timeout_ms: LONG_RESPONSE_TIMEOUT.as_millis() as u64,
            bin_count: DEFAULT_BIN_COUNT,
        }
    }
}

/// The decoded result of one submitted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    /// Semantic reply
    pub reply: DeckReply,
    /// Raw response bytes as collected
    pub raw: Vec<u8>,
    /// True when the inactivity timer ended the exchange (degraded data)
    pub partial: bool,
}

impl RequestOutcome {
    /// Whether the device accepted the request
    ///
    /// Partial responses still count as success; only an explicit NAK is a
    /// device-level rejection.
    pub fn success(&self) -> bool {
        !matches!(self.reply, DeckReply::Nak)
    }
}

/// The request engine: registry plus exchange policy
///
/// Generic over the channel I/O type so tests can run against in-memory
/// pipes; production engines are `DeckEngine` over real serial streams.
pub struct DeckEngine<T = SerialStream> {
    config: EngineConfig,
    registry: ChannelRegistry<Channel<T>>,
}

impl<T> DeckEngine<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            registry: ChannelRegistry::new(),
        }
    }

    /// The engine's configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The channel registry
    pub fn registry(&self) -> &ChannelRegistry<Channel<T>> {
        &self.registry
    }

    /// Register an already-open channel under `id`
    ///
    /// Idempotent-last-write, like the registry itself.
    pub fn attach_channel(&self, id: &str, channel: Channel<T>) {
        info!(id, path = channel.path(), "attaching channel");
        self.registry.register(id, Arc::new(channel));
    }

    /// Unregister a channel; returns whether one was registered
    pub fn unregister_channel(&self, id: &str) -> bool {
        self.registry.unregister(id).is_some()
    }

    /// Submit one request on one channel and decode the response
    pub async fn submit_request(
        &self,
        id: &str,
        request: DeckRequest,
    ) -> Result<RequestOutcome, LinkError> {
        self.submit_request_with_cancel(id, request, &CancellationToken::new())
            .await
    }

    /// [`Self::submit_request`] bound to an explicit cancellation token
    pub async fn submit_request_with_cancel(
        &self,
        id: &str,
        request: DeckRequest,
        cancel: &CancellationToken,
    ) -> Result<RequestOutcome, LinkError> {
        let channel = self.registry.lookup(id)?;

        // Parameter validation happens here, before any I/O
        let frame = request.encode(self.config.bin_count)?;
        let policy = self.policy_for(&request);

        debug!(
            id,
            protocol = request.protocol().name(),
            command = request.name(),
            "submitting request"
        );
        let reply = channel.exchange(&frame, &policy, cancel).await?;
        if reply.is_partial() {
            warn!(
                id,
                command = request.name(),
                len = reply.bytes.len(),
                "inactivity timer lapsed, decoding partial response"
            );
        }

        let decoded = status::interpret(&request, &reply.bytes);
        Ok(RequestOutcome {
            reply: decoded,
            partial: reply.is_partial(),
            raw: reply.bytes,
        })
    }

    /// Per-command collection policy
    ///
    /// Sense commands end on their fixed reply length, structured FlexiCart
    /// replies on the ETX terminator, and calibration-class commands get the
    /// long inactivity window.
    fn policy_for(&self, request: &DeckRequest) -> ExchangePolicy {
        let default = std::time::Duration::from_millis(self.config.response_timeout_ms);
        match request {
            DeckRequest::Deck(cmd) => {
                let policy = ExchangePolicy::new(default);
                match cmd.expected_reply_len() {
                    Some(len) => policy.with_expected_len(len),
                    None => policy,
                }
            }
            DeckRequest::Cart { command, .. } => {
                let window = if command.long_running() {
                    std::time::Duration::from_millis(self.config.long_response_timeout_ms)
                } else {
                    default
                };
                let policy = ExchangePolicy::new(window);
                if command.structured_reply() {
                    policy.with_terminator(flexicart::ETX)
                } else {
                    policy.with_expected_len(1)
                }
            }
        }
    }
}

impl<T> Default for DeckEngine<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn default() -> Self {
        Self::new()
    }
}

impl DeckEngine<SerialStream> {
    /// Open a serial port and register it under `id`
    pub async fn register_channel(
        &self,
        id: &str,
        config: ChannelConfig,
    ) -> Result<(), LinkError> {
        let channel = SerialChannel::open(config).await?;
        info!(id, path = channel.path(), "registered channel");
        self.registry.register(id, Arc::new(channel));
        Ok(())
    }
}
