//! # Beamline Motor Hardware Objects
//!
//! Adapters that present motorized quantities of a macromolecular
//! crystallography station through one generic motor contract:
//!
//! - [`motor::AxisMotor`] wraps a backend axis (position, state, limits,
//!   velocity, move/stop/wait) and relays its change notifications.
//! - [`motor::ResolutionMotor`] presents detector resolution [Å] as a
//!   virtual motor, converting between physical detector distance and
//!   crystallographic resolution and keeping the derived value in sync
//!   with distance and energy changes.
//!
//! ## Crate Structure
//!
//! - **`config`**: TOML station configuration (motor entries, detector
//!   geometry and beam calibration).
//! - **`error`**: the [`MotorError`] enum for adapter failures.
//! - **`geometry`**: the distance/resolution conversion math and the
//!   detector geometry types.
//! - **`hardware`**: consumed capability traits ([`hardware::Axis`],
//!   [`hardware::EnergySource`]) plus mock implementations for tests and
//!   simulation.
//! - **`motor`**: the [`motor::Motor`] trait and the two adapters.
//! - **`signal`**: per-motor observer registries for change
//!   notifications.
//!
//! ## Example
//!
//! ```rust,ignore
//! use beamline_motors::config::StationConfig;
//! use beamline_motors::hardware::{mock::MockAxis, AxisRegistry};
//! use beamline_motors::motor::{AxisMotor, Motor, ResolutionMotor};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = StationConfig::load_from("config/station.toml")?;
//! let mut registry = AxisRegistry::new();
//! registry.register(std::sync::Arc::new(MockAxis::new("dtox")));
//!
//! let distance = AxisMotor::initialize(&registry, &config.motors["dtox"])?;
//! println!("{} at {:?}", distance.username(), distance.get_value().await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod hardware;
pub mod motor;
pub mod signal;

pub use error::MotorError;
pub use motor::{AxisMotor, Motor, MotorState, ResolutionMotor};
pub use signal::{MotorEvent, MotorSignal, SignalRegistry};
