use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use readiness_core::{
    AudioLevel, DeviceKind, DeviceNotice, HostServices, NetworkAssessment, NullPreview, ReadinessConfig,
    ReadinessDelegate, ReadinessEngine, ReadinessSnapshot, SessionId, StaticNetworkInformation,
};
use readiness_host::{CpalMediaDevices, HttpReachabilityProbe, LoggingLauncher, StaticMetadata};

/// Pre-session device and network check
#[derive(Parser, Debug)]
#[command(name = "readiness-check")]
#[command(version, about = "Check camera, microphone and network before a live session", long_about = None)]
struct CliArgs {
    /// JSON config file (camelCase keys; omitted keys keep their defaults)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Name of the session being prepared for
    #[arg(short = 'd', long, value_name = "NAME")]
    destination: Option<String>,

    /// How long to meter the microphone before completing the test
    #[arg(long, value_name = "SECONDS", default_value_t = 3)]
    listen: u64,

    /// Accept the agreement and hand off when the check passes
    #[arg(long)]
    launch: bool,

    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,
}

/// Prints notices as they arrive; everything else goes to the log.
struct ConsoleDelegate;

impl ReadinessDelegate for ConsoleDelegate {
    fn on_state_changed(&self, snapshot: &ReadinessSnapshot) {
        log::debug!("State {:?} (progress {})", snapshot.state, snapshot.progress);
    }

    fn on_level_updated(&self, level: &AudioLevel) {
        log::trace!("Level {:.1}", level.amplitude);
    }

    fn on_notice(&self, notice: &DeviceNotice) {
        println!("! {}", notice.message);
    }

    fn on_network_assessed(&self, assessment: &NetworkAssessment) {
        log::debug!("Network assessed: {:?}", assessment.quality);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();

    let config = match args.config {
        Some(ref path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ReadinessConfig::from_json_str(&json)?
        }
        None => ReadinessConfig::default(),
    };

    let host = HostServices {
        devices: Arc::new(CpalMediaDevices::new(&config)),
        preview: Arc::new(NullPreview),
        probe: Arc::new(HttpReachabilityProbe::new(config.probe_timeout())?),
        network_info: Arc::new(StaticNetworkInformation(None)),
        metadata: Arc::new(StaticMetadata::new(args.destination.clone())),
        launcher: Arc::new(LoggingLauncher),
    };
    let mut engine = ReadinessEngine::new(config, host)?;
    engine.set_delegate(Arc::new(ConsoleDelegate));

    let mounted = engine.mount().await;
    println!("Getting ready for {}", mounted.destination_name);
    for kind in DeviceKind::ALL {
        let devices = mounted.devices.iter().filter(|d| d.kind == kind);
        for (index, device) in devices.enumerate() {
            println!("  {:<10} {}", kind, device.display_label(index));
        }
    }

    let tested = engine.start_test().await?;
    println!(
        "Camera: {}  Microphone: {}",
        tested.state.camera(),
        tested.state.microphone()
    );

    if engine.snapshot().state.microphone().is_granted() {
        println!("Speak to test your microphone...");
        tokio::time::sleep(Duration::from_secs(args.listen)).await;
        if let Some(level) = engine.snapshot().audio_level {
            println!("{} (level {:.0}/255)", level.class.message(), level.amplitude);
        }
    }

    let network = engine.snapshot().network;
    match network.mean_latency_ms {
        Some(ms) => println!(
            "Network: {:?}, {:.0} ms mean latency ({}/{} probes)",
            network.quality, ms, network.succeeded_probes, network.attempted_probes
        ),
        None => println!(
            "Network: {:?}, no probe succeeded ({} attempted)",
            network.quality, network.attempted_probes
        ),
    }

    match engine.complete_test().await {
        Ok(_) => println!("Device test complete."),
        Err(e) => {
            log::debug!("complete_test refused: {}", e);
            if let Some(message) = engine.snapshot().blocking_message {
                println!("{}", message);
            }
        }
    }

    if args.launch && engine.advance().is_ok() {
        engine.set_agreement(true)?;
        engine.accept_and_proceed(&SessionId::generate()).await?;
    }

    let snapshot = engine.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    println!("Progress: {}%", snapshot.progress);

    engine.teardown();
    Ok(())
}
