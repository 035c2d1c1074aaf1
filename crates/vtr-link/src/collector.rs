//! Response collection for one exchange
//!
//! Drives the write-then-collect half of an exchange: write the frame, then
//! append every inbound chunk to a buffer until one of three things happens,
//! whichever comes first:
//!
//! 1. the configured terminator byte appears in the most recent chunk;
//! 2. the buffer reaches the expected fixed length for the command;
//! 3. the inactivity timer fires.
//!
//! On (3) a non-empty buffer is returned as a partial success (broadcast
//! decks routinely answer slowly or in fragments) and only an empty buffer
//! is a [`LinkError::ResponseTimeout`]. The caller suspends at exactly one
//! point (the select below); there is no polling and no listener bookkeeping.
//!
//! Every exchange is bound to a [`CancellationToken`]; cancelling ends the
//! exchange with [`LinkError::Cancelled`] without touching success-path
//! behavior.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::LinkError;

/// Default inactivity window for a response
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(3000);
/// Inactivity window for long operations (calibration and the like)
pub const LONG_RESPONSE_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Per-exchange collection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangePolicy {
    /// Inactivity timer; resets on every inbound chunk
    pub response_timeout: Duration,
    /// Terminator byte that ends the exchange (e.g. ETX)
    pub terminator: Option<u8>,
    /// Expected fixed response length that ends the exchange
    pub expected_len: Option<usize>,
}

impl ExchangePolicy {
    /// Policy with only an inactivity timer
    pub fn new(response_timeout: Duration) -> Self {
        Self {
            response_timeout,
            terminator: None,
            expected_len: None,
        }
    }

    /// End the exchange when this byte appears in the latest chunk
    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// End the exchange once this many bytes have been collected
    pub fn with_expected_len(mut self, len: usize) -> Self {
        self.expected_len = Some(len);
        self
    }
}

impl Default for ExchangePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_TIMEOUT)
    }
}

/// How an exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Terminator byte seen
    Terminator,
    /// Expected length reached
    Length,
    /// Inactivity timer fired with a non-empty buffer (partial success)
    Lapsed,
}

/// The collected bytes of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Raw collected bytes; never empty
    pub bytes: Vec<u8>,
    /// How the exchange ended
    pub completion: Completion,
}

impl Reply {
    /// True when the inactivity timer ended the exchange early
    pub fn is_partial(&self) -> bool {
        self.completion == Completion::Lapsed
    }
}

/// Write `frame` and collect the response under `policy`
pub async fn collect<S>(
    io: &mut S,
    frame: &[u8],
    policy: &ExchangePolicy,
    cancel: &CancellationToken,
) -> Result<Reply, LinkError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    trace!(frame = ?frame, "writing frame");
    io.write_all(frame).await?;
    io.flush().await?;

    let timeout_ms = policy.response_timeout.as_millis() as u64;
    let mut collected: Vec<u8> = Vec::new();
    let mut buf = [0u8; 256];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(collected = collected.len(), "exchange cancelled");
                return Err(LinkError::Cancelled);
            }

            read = timeout(policy.response_timeout, io.read(&mut buf)) => match read {
                Ok(Ok(n)) if n > 0 => {
                    let chunk = &buf[..n];
                    trace!(chunk = ?chunk, "inbound chunk");
                    collected.extend_from_slice(chunk);

                    // Terminator is only honored in the most recent chunk
                    if let Some(term) = policy.terminator {
                        if chunk.contains(&term) {
                            debug!(len = collected.len(), "exchange ended by terminator");
                            return Ok(Reply {
                                bytes: collected,
                                completion: Completion::Terminator,
                            });
                        }
                    }

                    if let Some(expected) = policy.expected_len {
                        if collected.len() >= expected {
                            debug!(len = collected.len(), "exchange ended by length");
                            return Ok(Reply {
                                bytes: collected,
                                completion: Completion::Length,
                            });
                        }
                    }
                }

                // EOF: the peer closed the line; same policy as the timer
                Ok(Ok(_)) => {
                    return finish_lapsed(collected, timeout_ms);
                }

                Ok(Err(e)) => return Err(e.into()),

                // Inactivity timer fired
                Err(_) => {
                    return finish_lapsed(collected, timeout_ms);
                }
            }
        }
    }
}

/// Partial success for a non-empty buffer, timeout for an empty one
fn finish_lapsed(collected: Vec<u8>, timeout_ms: u64) -> Result<Reply, LinkError> {
    if collected.is_empty() {
        debug!(timeout_ms, "exchange ended with no bytes");
        Err(LinkError::ResponseTimeout(timeout_ms))
    } else {
        debug!(len = collected.len(), "exchange lapsed with partial response");
        Ok(Reply {
            bytes: collected,
            completion: Completion::Lapsed,
        })
    }
}
