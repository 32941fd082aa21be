// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! glowbarnd - GlowBarn sensor daemon
//!
//! Loads the sensor configuration, initializes every enabled sensor and
//! samples them at a fixed rate until interrupted. Sensors whose hardware
//! is missing run on a simulated signal.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use glowbarn_sensors::core::EventPayload;
use glowbarn_sensors::{build_info, Config, Engine, EventBus, RunContext, SensorManager, VERSION};

/// GlowBarn sensor daemon
#[derive(Parser, Debug)]
#[command(name = "glowbarnd")]
#[command(author = "GlowBarn Project")]
#[command(version = VERSION)]
#[command(about = "Multi-sensor environmental monitoring with anomaly flags")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Sampling rate in Hz (overrides the config)
    #[arg(long)]
    rate: Option<f64>,

    /// Seed for the simulated signal
    #[arg(long)]
    seed: Option<u64>,

    /// Take a single batch, print it as JSON and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging: flags win, then RUST_LOG, then the config
    let filter = if args.trace {
        EnvFilter::new("trace")
    } else if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🌟 GlowBarn sensor daemon v{}", VERSION);
    debug!(build = ?build_info(), "Build info");
    info!("Configuration loaded from {:?}", config_path);

    // Override with command line args
    if let Some(rate) = args.rate {
        config.sampling.rate_hz = rate;
    }
    if let Some(seed) = args.seed {
        config.sampling.seed = Some(seed);
    }
    config.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    if args.once {
        rt.block_on(run_once(config))
    } else {
        rt.block_on(run_daemon(config))
    }
}

/// Initialize, sample one batch, print its summary
async fn run_once(config: Config) -> Result<()> {
    let bus = std::sync::Arc::new(EventBus::new(config.event_capacity));
    let manager = SensorManager::new(&config, RunContext::new(), bus);

    manager.initialize().await;
    let batch = manager.sample_once().await;
    manager.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&batch.summary())?);
    Ok(())
}

/// Sample until Ctrl+C
async fn run_daemon(config: Config) -> Result<()> {
    let mut engine = Engine::new(config)?;
    let mut events = engine.event_bus().subscribe_events();

    let ready = engine.start().await?;
    if ready == 0 {
        warn!("No sensors ready; sampling loop will produce empty batches");
    }

    info!("🚀 GlowBarn running");
    info!("   Press Ctrl+C to shutdown");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => match event.payload {
                    EventPayload::Alert { sensor_id, value, reason, .. } => {
                        info!(sensor = %sensor_id, value, %reason, "Anomaly flagged");
                    }
                    EventPayload::Motion { sensor_id, total_events } => {
                        info!(sensor = %sensor_id, total_events, "Motion");
                    }
                    EventPayload::SensorFault { sensor_id, message } => {
                        warn!(sensor = %sensor_id, %message, "Sensor fault");
                    }
                    EventPayload::Status { key, value } => {
                        debug!(%key, %value, "Status");
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event listener lagging");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    info!("Shutdown signal received, cleaning up...");
    let state = engine.state().await;
    engine.stop().await?;
    info!(batches = state.batches_sampled, uptime_s = state.uptime_seconds, "GlowBarn shutdown complete");

    Ok(())
}
