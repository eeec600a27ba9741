use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use crate::models::config::ReadinessConfig;
use crate::models::error::ReadinessError;
use crate::models::network::{NetworkAssessment, NetworkProbeResult, QualityClass};
use crate::traits::network::{NetworkInformation, ReachabilityProbe};

/// Thresholds for `classify`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    pub good_latency_ms: f64,
    pub min_downlink_mbps: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            good_latency_ms: 200.0,
            min_downlink_mbps: 1.0,
        }
    }
}

/// Mean latency over succeeding probes only; `None` when none succeeded.
pub fn aggregate(results: &[NetworkProbeResult]) -> Option<f64> {
    let latencies: Vec<f64> = results
        .iter()
        .filter(|r| r.succeeded)
        .filter_map(|r| r.latency_ms)
        .collect();
    if latencies.is_empty() {
        return None;
    }
    Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
}

/// Bucket the measured conditions.
///
/// A slow downlink forces `poor` regardless of latency. With no probe
/// success, attempted probes mean the network is unreachable (`poor`);
/// without any attempt there is nothing to go on (`unknown`).
pub fn classify(
    mean_latency_ms: Option<f64>,
    downlink_mbps: Option<f64>,
    attempted_probes: usize,
    thresholds: QualityThresholds,
) -> QualityClass {
    if downlink_mbps.is_some_and(|d| d < thresholds.min_downlink_mbps) {
        return QualityClass::Poor;
    }
    match mean_latency_ms {
        Some(ms) if ms < thresholds.good_latency_ms => QualityClass::Good,
        Some(_) => QualityClass::Poor,
        None if attempted_probes > 0 => QualityClass::Poor,
        None => QualityClass::Unknown,
    }
}

/// Network quality prober.
///
/// Fans out one timed probe per endpoint, joins only after every probe has
/// settled, and never fails: probe errors and timeouts are folded into the
/// assessment.
pub struct NetworkProber {
    probe: Arc<dyn ReachabilityProbe>,
    info: Arc<dyn NetworkInformation>,
    endpoints: Vec<String>,
    timeout: Duration,
    thresholds: QualityThresholds,
}

impl NetworkProber {
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        info: Arc<dyn NetworkInformation>,
        config: &ReadinessConfig,
    ) -> Self {
        Self {
            probe,
            info,
            endpoints: config.probe_endpoints.clone(),
            timeout: config.probe_timeout(),
            thresholds: QualityThresholds {
                good_latency_ms: config.good_latency_ms,
                min_downlink_mbps: config.min_downlink_mbps,
            },
        }
    }

    pub async fn run(&self) -> NetworkAssessment {
        let connection = self.info.connection_info().unwrap_or_default();

        let probes = self.endpoints.iter().map(|endpoint| self.timed_probe(endpoint));
        let results = join_all(probes).await;

        let mean_latency_ms = aggregate(&results);
        let succeeded = results.iter().filter(|r| r.succeeded).count();
        if succeeded == 0 && connection.downlink_mbps.is_none() && connection.effective_type.is_none() {
            log::warn!("{}: all {} probes failed", ReadinessError::NoSignal, results.len());
        }

        let quality = classify(
            mean_latency_ms,
            connection.downlink_mbps,
            results.len(),
            self.thresholds,
        );
        log::info!(
            "Network {:?}: mean latency {:?} ms, downlink {:?} Mbps, {}/{} probes ok",
            quality,
            mean_latency_ms,
            connection.downlink_mbps,
            succeeded,
            results.len()
        );

        NetworkAssessment {
            mean_latency_ms,
            downlink_mbps: connection.downlink_mbps,
            connection_type: connection.effective_type,
            quality,
            attempted_probes: results.len(),
            succeeded_probes: succeeded,
            probes: results,
            measured_at: Some(chrono::Utc::now()),
        }
    }

    async fn timed_probe(&self, endpoint: &str) -> NetworkProbeResult {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.probe.probe(endpoint)).await {
            Ok(Ok(())) => {
                let latency = started.elapsed().as_secs_f64() * 1000.0;
                log::debug!("Probe {} ok in {:.1} ms", endpoint, latency);
                NetworkProbeResult::success(endpoint, latency)
            }
            Ok(Err(e)) => {
                log::debug!("Probe {} failed: {}", endpoint, e);
                NetworkProbeResult::failure(endpoint)
            }
            Err(_) => {
                log::debug!(
                    "Probe {} failed: {}",
                    endpoint,
                    ReadinessError::ProbeFailed(format!("no response within {:?}", self.timeout))
                );
                NetworkProbeResult::failure(endpoint)
            }
        }
    }
}
