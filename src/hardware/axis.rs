//! Axis capability trait and axis name resolution.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::MotorError;

/// Asynchronous change notification from an axis backend.
#[derive(Debug, Clone)]
pub enum AxisEvent {
    /// The axis position changed [device-native units].
    PositionChanged(f64),
    /// The axis state changed. The payload is the backend's state-name
    /// set; an empty set means the backend did not attach one, and the
    /// subscriber should read the state back itself.
    StateChanged(Vec<String>),
    /// A commanded move finished.
    MoveDone,
}

/// One real motorized degree of freedom.
///
/// This is the consumed capability interface: position, state, soft
/// limits, velocity, move/stop, blocking wait and change notifications.
/// All state authority lives behind this trait; adapters only cache.
///
/// # Contract
/// - Positions and limits are device-native units (mm for a distance axis)
/// - `limits` bounds are `None` where the backend has no soft limit
/// - `move_to` with `wait = false` returns once the move is accepted
/// - `wait_move` blocks until motion completes, with no deadline of its
///   own (callers bound it)
/// - `stop` is a non-blocking stop request
#[async_trait]
pub trait Axis: Send + Sync {
    /// Backend name of this axis (the name it is registered under).
    fn name(&self) -> &str;

    /// Current position.
    async fn position(&self) -> Result<f64>;

    /// Current backend state names.
    async fn state_names(&self) -> Result<Vec<String>>;

    /// Soft limits, `None` per unset bound.
    async fn limits(&self) -> Result<(Option<f64>, Option<f64>)>;

    /// Current velocity [unit/s].
    async fn velocity(&self) -> Result<f64>;

    /// Move to an absolute target, optionally blocking until done.
    async fn move_to(&self, target: f64, wait: bool) -> Result<()>;

    /// Block until the current move completes.
    async fn wait_move(&self) -> Result<()>;

    /// Request a stop without waiting for it.
    async fn stop(&self) -> Result<()>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AxisEvent>;
}

/// Name-to-axis lookup used when adapters are constructed from
/// configuration.
///
/// Populated once at station start-up; motors resolve their configured
/// axis name here and fail construction if it is absent.
#[derive(Default)]
pub struct AxisRegistry {
    axes: HashMap<String, Arc<dyn Axis>>,
}

impl AxisRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an axis under its backend name. Re-registering a name
    /// replaces the previous entry.
    pub fn register(&mut self, axis: Arc<dyn Axis>) {
        self.axes.insert(axis.name().to_string(), axis);
    }

    /// Resolve an axis by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Axis>, MotorError> {
        self.axes
            .get(name)
            .cloned()
            .ok_or_else(|| MotorError::UnresolvedAxis(name.to_string()))
    }

    /// Names of all registered axes.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(String::as_str)
    }
}
