//! Generic motor contract and its adapters.
//!
//! GUI and experiment-control code sees every motorized quantity through
//! the [`Motor`] trait, whether it is a real axis ([`AxisMotor`]) or a
//! derived quantity pretending to be one ([`ResolutionMotor`]). Consumers
//! observe changes through each motor's [`SignalRegistry`].

pub mod axis_motor;
pub mod resolution;
pub mod state;

pub use axis_motor::AxisMotor;
pub use resolution::ResolutionMotor;
pub use state::MotorState;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::signal::SignalRegistry;

/// Substitute for an unset low soft limit. Some GUI components cannot
/// handle unbounded limits, so a very large magnitude stands in.
pub const NO_LIMIT_LOW: f64 = -1e6;
/// Substitute for an unset high soft limit.
pub const NO_LIMIT_HIGH: f64 = 1e6;

/// The generic motor contract.
///
/// # Contract
/// - `get_value` is `Option<f64>`: `None` means the value is currently
///   undefined, which only derived motors produce
/// - `set_value` with `wait = true` blocks on the backend's own blocking
///   semantics; a `timeout` adds a bounded wait afterwards that fails
///   with a timeout error when exceeded
/// - `wait_move(None)` blocks until motion completes
/// - `stop` is non-blocking
#[async_trait]
pub trait Motor: Send + Sync {
    /// Human-readable label from configuration.
    fn username(&self) -> &str;

    /// Change-notification registry for this motor.
    fn signals(&self) -> &SignalRegistry;

    /// Current motor state.
    async fn get_state(&self) -> Result<MotorState>;

    /// Current value, `None` when currently undefined.
    async fn get_value(&self) -> Result<Option<f64>>;

    /// Low and high limits.
    async fn get_limits(&self) -> Result<(f64, f64)>;

    /// Current velocity [unit/s]. Not every motor has one.
    async fn get_velocity(&self) -> Result<f64> {
        Err(crate::error::MotorError::NotSupported("velocity").into())
    }

    /// Move to an absolute value.
    async fn set_value(&self, value: f64, wait: bool, timeout: Option<Duration>) -> Result<()>;

    /// Block until motion completes, or until `timeout` elapses.
    async fn wait_move(&self, timeout: Option<Duration>) -> Result<()>;

    /// Request a stop.
    async fn stop(&self) -> Result<()>;

    /// Whether the motor is ready to accept a move.
    async fn is_ready(&self) -> Result<bool> {
        Ok(self.get_state().await? == MotorState::Ready)
    }
}
