use std::time::Duration;

use serde::Deserialize;

use super::error::ReadinessError;

/// Tunables for a readiness check.
///
/// Every field has a default, so a JSON config only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadinessConfig {
    /// Highly available endpoints hit by the reachability probes (at least 3).
    pub probe_endpoints: Vec<String>,

    /// Per-probe bound; a probe still pending after this counts as failed.
    pub probe_timeout_ms: u64,

    /// Mean latency below this is `good` (default: 200).
    pub good_latency_ms: f64,

    /// Estimated downlink below this forces `poor` (default: 1.0).
    pub min_downlink_mbps: f64,

    /// FFT size of the level analyser; yields `fft_size / 2` bins (default: 256).
    pub fft_size: usize,

    /// Mean bin energy (0–255) below which the microphone reads as too quiet (default: 10).
    pub quiet_threshold: f32,

    /// Time smoothing between analyser frames, 0.0–1.0 (default: 0.8).
    pub smoothing: f32,

    /// Sampling tick period; 16ms tracks a 60Hz display (default: 16).
    pub sample_interval_ms: u64,

    /// Capacity of the sample tap a microphone track feeds (default: 4096).
    pub tap_capacity: usize,

    /// Shown when the session metadata provider cannot supply a name.
    pub fallback_destination_name: String,
}

impl ReadinessConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ReadinessError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ReadinessError::ConfigurationFailed(format!("invalid config: {}", e)))?;
        config.validate().map_err(ReadinessError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.probe_endpoints.len() < 3 {
            return Err(format!(
                "at least 3 probe endpoints required, got {}",
                self.probe_endpoints.len()
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err("probe timeout must be positive".into());
        }
        if self.good_latency_ms <= 0.0 {
            return Err("latency threshold must be positive".into());
        }
        if self.min_downlink_mbps <= 0.0 {
            return Err("downlink threshold must be positive".into());
        }
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(format!("unsupported fft size: {}", self.fft_size));
        }
        if !(0.0..=255.0).contains(&self.quiet_threshold) {
            return Err(format!("quiet threshold out of range: {}", self.quiet_threshold));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(format!("smoothing out of range: {}", self.smoothing));
        }
        if self.sample_interval_ms == 0 {
            return Err("sample interval must be positive".into());
        }
        if self.tap_capacity < self.fft_size {
            return Err("tap capacity must hold at least one fft frame".into());
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            probe_endpoints: vec![
                "https://www.google.com/favicon.ico".into(),
                "https://www.cloudflare.com/favicon.ico".into(),
                "https://www.microsoft.com/favicon.ico".into(),
            ],
            probe_timeout_ms: 5000,
            good_latency_ms: 200.0,
            min_downlink_mbps: 1.0,
            fft_size: 256,
            quiet_threshold: 10.0,
            smoothing: 0.8,
            sample_interval_ms: 16,
            tap_capacity: 4096,
            fallback_destination_name: "your interview".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ReadinessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bin_count(), 128);
    }

    #[test]
    fn json_overrides_single_keys() {
        let config = ReadinessConfig::from_json_str(r#"{"probeTimeoutMs": 1500}"#).unwrap();
        assert_eq!(config.probe_timeout(), Duration::from_millis(1500));
        assert_eq!(config.probe_endpoints.len(), 3);
    }

    #[test]
    fn rejects_too_few_endpoints() {
        let err = ReadinessConfig::from_json_str(r#"{"probeEndpoints": ["https://a", "https://b"]}"#)
            .unwrap_err();
        assert!(matches!(err, ReadinessError::ConfigurationFailed(_)));
    }

    #[test]
    fn rejects_odd_fft_size() {
        let config = ReadinessConfig {
            fft_size: 200,
            ..ReadinessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ReadinessConfig::from_json_str("{").is_err());
    }
}
