//! # readiness-host
//!
//! Desktop backends for readiness-core.
//!
//! Provides:
//! - `CpalMediaDevices`: microphone and speaker enumeration plus microphone capture via cpal
//! - `HttpReachabilityProbe`: uncached `HEAD` probes via reqwest
//! - `StaticMetadata` / `LoggingLauncher`: minimal session collaborators
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use readiness_core::{HostServices, NullPreview, ReadinessConfig, ReadinessEngine, StaticNetworkInformation};
//! use readiness_host::{CpalMediaDevices, HttpReachabilityProbe, LoggingLauncher, StaticMetadata};
//!
//! let config = ReadinessConfig::default();
//! let host = HostServices {
//!     devices: Arc::new(CpalMediaDevices::new(&config)),
//!     preview: Arc::new(NullPreview),
//!     probe: Arc::new(HttpReachabilityProbe::new(config.probe_timeout())?),
//!     network_info: Arc::new(StaticNetworkInformation(None)),
//!     metadata: Arc::new(StaticMetadata::new(Some("Acme Corp".into()))),
//!     launcher: Arc::new(LoggingLauncher),
//! };
//! let engine = ReadinessEngine::new(config, host)?;
//! ```

pub mod cpal_devices;
pub mod error;
pub mod http_probe;
pub mod session;

pub use cpal_devices::{CpalMediaDevices, CpalMicTrack};
pub use error::HostError;
pub use http_probe::HttpReachabilityProbe;
pub use session::{LoggingLauncher, StaticMetadata};
