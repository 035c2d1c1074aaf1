//! Sequential channel probing
//!
//! The scanner probes a list of candidate channels one at a time with a
//! lightweight status request under short timeouts and compiles a discovery
//! report. Per-candidate failures are diagnosed three ways (device node
//! missing, node present but not accessible, or opened but silent) and
//! never abort the remaining probes.
//!
//! Probes are deliberately serialized. Multiport serial hardware shares a
//! bus, and parallel fan-out changes the failure semantics; the latency cost
//! is accepted on purpose.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vtr_link::{Channel, ChannelConfig, ExchangePolicy, LinkError, SerialChannel};
use vtr_protocol::status::{decode_device_status, DeviceStatus};
use vtr_protocol::SonyCommand;

/// Scanner timing configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScanConfig {
    /// Response window per probe (ms); short on purpose
    pub probe_timeout_ms: u64,
    /// Open window per candidate (ms)
    pub open_timeout_ms: u64,
    /// Settle delay between candidates (ms)
    pub inter_probe_delay_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 500,
            open_timeout_ms: 250,
            inter_probe_delay_ms: 50,
        }
    }
}

/// Outcome of probing one candidate channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelDiagnosis {
    /// The device answered with at least one byte
    Responding,
    /// The port opened but nothing arrived within the window
    Silent,
    /// The device node does not exist
    NodeMissing,
    /// The node exists but could not be opened (held, permissions, wedged)
    NotAccessible,
}

impl ChannelDiagnosis {
    /// Human-readable diagnosis for logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelDiagnosis::Responding => "responding",
            ChannelDiagnosis::Silent => "silent",
            ChannelDiagnosis::NodeMissing => "node missing",
            ChannelDiagnosis::NotAccessible => "not accessible",
        }
    }
}

/// One candidate's probe record
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProbeRecord {
    /// Candidate channel id (the device node path)
    pub channel_id: String,
    /// How the candidate answered, or failed to
    pub diagnosis: ChannelDiagnosis,
    /// Decoded status, for responding candidates
    pub status: Option<DeviceStatus>,
    /// Whether the response was ended by the inactivity timer
    pub partial: bool,
}

/// Compiled discovery report for one scan
#[derive(Debug, Clone, Default)]
pub struct InventoryReport {
    /// Per-candidate records, in probe order
    pub records: Vec<ProbeRecord>,
}

impl InventoryReport {
    /// Records for candidates that answered
    pub fn responding(&self) -> impl Iterator<Item = &ProbeRecord> {
        self.records
            .iter()
            .filter(|r| r.diagnosis == ChannelDiagnosis::Responding)
    }

    /// Last-known status per responding channel
    ///
    /// Rebuilt wholesale from this scan; callers replace, never patch, any
    /// inventory they keep.
    pub fn inventory(&self) -> HashMap<String, DeviceStatus> {
        self.responding()
            .filter_map(|r| {
                r.status
                    .clone()
                    .map(|status| (r.channel_id.clone(), status))
            })
            .collect()
    }
}

/// Sequential channel scanner
pub struct ChannelScanner {
    config: ScanConfig,
}

impl ChannelScanner {
    /// Scanner with default timing
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    /// Scanner with custom timing
    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Probe every candidate in order and compile the report
    pub async fn scan(&self, candidates: &[ChannelConfig]) -> InventoryReport {
        let mut report = InventoryReport::default();

        for candidate in candidates {
            let record = self.probe_candidate(candidate).await;
            debug!(
                channel = %record.channel_id,
                diagnosis = record.diagnosis.as_str(),
                "probe finished"
            );
            report.records.push(record);
            tokio::time::sleep(Duration::from_millis(self.config.inter_probe_delay_ms)).await;
        }

        info!(
            candidates = report.records.len(),
            responding = report.responding().count(),
            "scan complete"
        );
        report
    }

    /// Open and probe one candidate
    pub async fn probe_candidate(&self, candidate: &ChannelConfig) -> ProbeRecord {
        let mut config = candidate.clone();
        config.open_timeout_ms = self.config.open_timeout_ms;
        let id = config.path.clone();

        match SerialChannel::open(config).await {
            Ok(channel) => self.probe_open_channel(&id, &channel).await,
            Err(LinkError::OpenTimeout(_)) => record(&id, ChannelDiagnosis::NotAccessible),
            Err(LinkError::PortUnavailable { path, reason }) => {
                let diagnosis = if Path::new(&path).exists() {
                    ChannelDiagnosis::NotAccessible
                } else {
                    ChannelDiagnosis::NodeMissing
                };
                debug!(channel = %id, %reason, "open failed");
                record(&id, diagnosis)
            }
            Err(e) => {
                warn!(channel = %id, error = %e, "unexpected open failure");
                record(&id, ChannelDiagnosis::NotAccessible)
            }
        }
    }

    /// Probe an already-open stream; testable without hardware
    pub async fn probe_stream<S>(&self, id: &str, io: S) -> ProbeRecord
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let channel = Channel::from_io(ChannelConfig::new(id), io);
        self.probe_open_channel(id, &channel).await
    }

    /// Send the lightweight status request and diagnose the answer
    async fn probe_open_channel<T>(&self, id: &str, channel: &Channel<T>) -> ProbeRecord
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let probe = SonyCommand::StatusSense;
        let frame = match probe.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(channel = id, error = %e, "probe command rejected");
                return record(id, ChannelDiagnosis::NotAccessible);
            }
        };

        let mut policy = ExchangePolicy::new(Duration::from_millis(self.config.probe_timeout_ms));
        if let Some(len) = probe.expected_reply_len() {
            policy = policy.with_expected_len(len);
        }

        match channel.exchange(&frame, &policy, &CancellationToken::new()).await {
            Ok(reply) => ProbeRecord {
                channel_id: id.to_string(),
                diagnosis: ChannelDiagnosis::Responding,
                status: Some(decode_device_status(&reply.bytes)),
                partial: reply.is_partial(),
            },
            Err(LinkError::ResponseTimeout(_)) => record(id, ChannelDiagnosis::Silent),
            Err(e) => {
                warn!(channel = id, error = %e, "probe exchange failed");
                record(id, ChannelDiagnosis::NotAccessible)
            }
        }
    }
}

impl Default for ChannelScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Record without a decoded status
fn record(id: &str, diagnosis: ChannelDiagnosis) -> ProbeRecord {
    ProbeRecord {
        channel_id: id.to_string(),
        diagnosis,
        status: None,
        partial: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use vtr_protocol::status::TransportMode;

    fn quick_scanner() -> ChannelScanner {
        ChannelScanner::with_config(ScanConfig {
            probe_timeout_ms: 100,
            open_timeout_ms: 50,
            inter_probe_delay_ms: 1,
        })
    }

    #[tokio::test]
    async fn test_responding_stream_decodes_status() {
        let (near, mut far) = tokio::io::duplex(64);

        tokio::spawn(async move {
            let mut frame = [0u8; 4];
            far.read_exact(&mut frame).await.unwrap();
            far.write_all(&[0xF7, 0x7E, 0x00, 0x00, 0x00]).await.unwrap();
        });

        let record = quick_scanner().probe_stream("pipe-0", near).await;
        assert_eq!(record.diagnosis, ChannelDiagnosis::Responding);
        let status = record.status.unwrap();
        assert_eq!(status.mode, TransportMode::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_diagnosed_silent() {
        let (near, mut far) = tokio::io::duplex(64);

        tokio::spawn(async move {
            let mut frame = [0u8; 4];
            far.read_exact(&mut frame).await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let record = quick_scanner().probe_stream("pipe-0", near).await;
        assert_eq!(record.diagnosis, ChannelDiagnosis::Silent);
        assert!(record.status.is_none());
    }

    #[tokio::test]
    async fn test_scan_continues_past_failed_candidates() {
        // None of these nodes exist; every candidate must still get a record
        let candidates: Vec<ChannelConfig> = (1..=5)
            .map(|n| ChannelConfig::new(format!("/dev/nonexistent-deck-{n}")))
            .collect();

        let report = quick_scanner().scan(&candidates).await;

        assert_eq!(report.records.len(), 5);
        for (n, record) in report.records.iter().enumerate() {
            assert_eq!(
                record.channel_id,
                format!("/dev/nonexistent-deck-{}", n + 1)
            );
            assert_eq!(record.diagnosis, ChannelDiagnosis::NodeMissing);
        }
        assert_eq!(report.responding().count(), 0);
        assert!(report.inventory().is_empty());
    }

    #[tokio::test]
    async fn test_existing_non_tty_node_is_not_accessible() {
        // A regular file exists but is no serial port
        let dir = std::env::temp_dir().join("vtr-scan-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("not-a-port");
        std::fs::write(&path, b"").unwrap();

        let record = quick_scanner()
            .probe_candidate(&ChannelConfig::new(path.to_string_lossy().to_string()))
            .await;
        // Open either fails (not accessible) or the "device" stays mute
        assert!(matches!(
            record.diagnosis,
            ChannelDiagnosis::NotAccessible | ChannelDiagnosis::Silent
        ));
        assert_ne!(record.diagnosis, ChannelDiagnosis::Responding);
    }

    #[test]
    fn test_inventory_rebuilt_from_responding_records() {
        let status = decode_device_status(&[0xD7, 0xBD, 0x01]);
        let report = InventoryReport {
            records: vec![
                ProbeRecord {
                    channel_id: "vtr-1".into(),
                    diagnosis: ChannelDiagnosis::Responding,
                    status: Some(status.clone()),
                    partial: false,
                },
                record("vtr-2", ChannelDiagnosis::Silent),
                record("vtr-3", ChannelDiagnosis::NodeMissing),
            ],
        };

        let inventory = report.inventory();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory["vtr-1"].mode, TransportMode::Play);
    }
}
