//! Generic motor adapter over a backend axis.
//!
//! Pure pass-through plumbing: every read goes to the axis, every command
//! goes to the axis, and axis change notifications are relayed as this
//! motor's own signals. The only state held here is a last-known
//! position/state cache updated by the relay, kept behind locks because
//! the relay runs on its own task.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::warn;

use crate::config::MotorConfig;
use crate::error::MotorError;
use crate::hardware::axis::{Axis, AxisEvent, AxisRegistry};
use crate::motor::state::MotorState;
use crate::motor::{Motor, NO_LIMIT_HIGH, NO_LIMIT_LOW};
use crate::signal::{MotorEvent, SignalRegistry};

/// Motor adapter for one backend axis.
///
/// Construct with [`AxisMotor::initialize`] (resolving a configured axis
/// name) or [`AxisMotor::bind`] (wrapping an axis handle directly). Both
/// spawn the notification relay and therefore must run inside a Tokio
/// runtime.
pub struct AxisMotor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AxisMotor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisMotor")
            .field("username", &self.inner.username)
            .finish_non_exhaustive()
    }
}

struct Inner {
    username: String,
    tolerance: Option<f64>,
    axis: Arc<dyn Axis>,
    state: RwLock<MotorState>,
    position: RwLock<Option<f64>>,
    signals: SignalRegistry,
}

impl AxisMotor {
    /// Resolve the configured axis name and bind to it.
    ///
    /// Fails if the axis cannot be resolved in the registry.
    pub fn initialize(registry: &AxisRegistry, config: &MotorConfig) -> Result<Self, MotorError> {
        let axis = registry.resolve(&config.axis)?;
        let username = config
            .username
            .clone()
            .unwrap_or_else(|| config.axis.clone());
        Ok(Self::bind(username, config.tolerance, axis))
    }

    /// Bind directly to an axis handle.
    pub fn bind(username: impl Into<String>, tolerance: Option<f64>, axis: Arc<dyn Axis>) -> Self {
        let inner = Arc::new(Inner {
            username: username.into(),
            tolerance,
            axis,
            state: RwLock::new(MotorState::Unknown),
            position: RwLock::new(None),
            signals: SignalRegistry::new(),
        });
        Inner::spawn_relay(&inner);
        Self { inner }
    }

    /// Backend name of the bound axis.
    pub fn axis_name(&self) -> &str {
        self.inner.axis.name()
    }

    /// Configured position tolerance, if any.
    pub fn tolerance(&self) -> Option<f64> {
        self.inner.tolerance
    }

    /// Last state seen by the notification relay.
    pub fn cached_state(&self) -> MotorState {
        *self.inner.state.read()
    }

    /// Last position seen by the notification relay.
    pub fn cached_position(&self) -> Option<f64> {
        *self.inner.position.read()
    }
}

impl Inner {
    /// Relay axis events into this motor's signals until the motor (or
    /// the axis event channel) goes away.
    fn spawn_relay(inner: &Arc<Inner>) {
        let weak = Arc::downgrade(inner);
        let mut events = inner.axis.subscribe();
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "axis event relay lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                inner.handle_event(event).await;
            }
        });
    }

    async fn handle_event(&self, event: AxisEvent) {
        match event {
            AxisEvent::PositionChanged(position) => self.update_position(position),
            AxisEvent::StateChanged(names) if !names.is_empty() => {
                self.update_state(MotorState::from_names(&names));
            }
            // No state payload attached, or a completed move: read the
            // state back from the axis.
            AxisEvent::StateChanged(_) | AxisEvent::MoveDone => {
                let state = match self.axis.state_names().await {
                    Ok(names) => MotorState::from_names(&names),
                    Err(err) => {
                        warn!(axis = self.axis.name(), %err, "state read-back failed");
                        MotorState::Unknown
                    }
                };
                self.update_state(state);
            }
        }
    }

    fn update_position(&self, position: f64) {
        *self.position.write() = Some(position);
        self.signals
            .emit(&MotorEvent::PositionChanged(Some(position)));
        self.signals.emit(&MotorEvent::ValueChanged(Some(position)));
    }

    fn update_state(&self, state: MotorState) {
        *self.state.write() = state;
        self.signals.emit(&MotorEvent::StateChanged(state));
    }
}

#[async_trait]
impl Motor for AxisMotor {
    fn username(&self) -> &str {
        &self.inner.username
    }

    fn signals(&self) -> &SignalRegistry {
        &self.inner.signals
    }

    async fn get_state(&self) -> Result<MotorState> {
        let names = self.inner.axis.state_names().await?;
        let state = MotorState::from_names(&names);
        *self.inner.state.write() = state;
        Ok(state)
    }

    async fn get_value(&self) -> Result<Option<f64>> {
        let position = self.inner.axis.position().await?;
        *self.inner.position.write() = Some(position);
        Ok(Some(position))
    }

    async fn get_limits(&self) -> Result<(f64, f64)> {
        let (low, high) = self.inner.axis.limits().await?;
        Ok((low.unwrap_or(NO_LIMIT_LOW), high.unwrap_or(NO_LIMIT_HIGH)))
    }

    async fn get_velocity(&self) -> Result<f64> {
        self.inner.axis.velocity().await
    }

    async fn set_value(&self, value: f64, wait: bool, timeout: Option<Duration>) -> Result<()> {
        self.inner.axis.move_to(value, wait).await?;
        if let Some(timeout) = timeout {
            self.wait_move(Some(timeout)).await?;
        }
        Ok(())
    }

    async fn wait_move(&self, timeout: Option<Duration>) -> Result<()> {
        match timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.inner.axis.wait_move())
                .await
                .map_err(|_| MotorError::Timeout(deadline))??,
            None => self.inner.axis.wait_move().await?,
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.inner.axis.stop().await
    }
}
