//! Station simulator.
//!
//! Wires the motor adapters to mock hardware and walks through a typical
//! session: read state/value/limits, watch change notifications, move the
//! resolution motor. Useful for eyeballing the adapters without a control
//! system.
//!
//! ```bash
//! RUST_LOG=info cargo run --bin station_sim
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beamline_motors::config::StationConfig;
use beamline_motors::hardware::mock::{MockAxis, MockEnergy};
use beamline_motors::hardware::AxisRegistry;
use beamline_motors::motor::{AxisMotor, Motor, ResolutionMotor};
use beamline_motors::signal::{MotorEvent, MotorSignal};

#[derive(Parser)]
#[command(name = "station_sim")]
#[command(about = "Simulated beamline station for the motor adapters", long_about = None)]
struct Cli {
    /// Station configuration file
    #[arg(long, default_value = "config/station.toml")]
    config: PathBuf,

    /// Initial detector distance [mm]
    #[arg(long, default_value_t = 350.0)]
    distance: f64,

    /// Photon energy [keV]
    #[arg(long, default_value_t = 12.7)]
    energy: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = StationConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.validate()?;

    let mut registry = AxisRegistry::new();
    registry.register(Arc::new(
        MockAxis::new("dtox")
            .with_position(cli.distance)
            .with_limits(Some(120.0), Some(1000.0))
            .with_speed(500.0),
    ));

    let dtox = config
        .motors
        .get("dtox")
        .context("config has no [motors.dtox] entry")?;
    let distance = Arc::new(AxisMotor::initialize(&registry, dtox)?);
    let energy = Arc::new(MockEnergy::new(cli.energy));
    let resolution = ResolutionMotor::initialize(
        "Resolution",
        config.detector.as_ref(),
        Arc::clone(&distance),
        Arc::clone(&energy) as Arc<dyn beamline_motors::hardware::EnergySource>,
    )?;

    resolution
        .signals()
        .connect(MotorSignal::ValueChanged, |event| {
            if let MotorEvent::ValueChanged(value) = event {
                info!(?value, "resolution changed");
            }
        });

    info!(
        motor = distance.username(),
        state = ?distance.get_state().await?,
        value = ?distance.get_value().await?,
        limits = ?distance.get_limits().await?,
        velocity = distance.get_velocity().await?,
        "distance motor up"
    );
    info!(
        motor = resolution.username(),
        value = ?resolution.get_value().await?,
        at_corner = ?resolution.get_value_at_corner().await?,
        limits = ?resolution.get_limits().await?,
        "resolution motor up"
    );

    let target = 2.0;
    info!(target, "requesting resolution move");
    resolution
        .set_value(target, true, Some(Duration::from_secs(30)))
        .await?;
    // Let the notification relay drain before reading back.
    tokio::time::sleep(Duration::from_millis(100)).await;

    info!(
        value = ?resolution.get_value().await?,
        distance_mm = ?distance.get_value().await?,
        "move complete"
    );
    Ok(())
}
