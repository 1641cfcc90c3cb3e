//! Mock hardware implementations.
//!
//! Simulated collaborators for testing the adapters without a control
//! system: a motorized axis with finite motion speed and change
//! notifications, and an energy source with a settable reading.
//!
//! All mocks use async-safe operations (`tokio::time::sleep`, never
//! `std::thread::sleep`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::hardware::axis::{Axis, AxisEvent};
use crate::hardware::energy::EnergySource;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Simulated motorized axis.
///
/// Moves at a configurable speed (default 1000 mm/s so tests stay fast),
/// tracks soft limits and backend state names, and emits
/// position/state/move-done events the way a real control system would.
///
/// # Example
///
/// ```rust,ignore
/// let axis = MockAxis::new("dtox").with_position(200.0);
/// axis.move_to(250.0, true).await?;
/// assert_eq!(axis.position().await?, 250.0);
/// ```
pub struct MockAxis {
    name: String,
    position: Arc<RwLock<f64>>,
    states: Arc<RwLock<Vec<String>>>,
    limits: RwLock<(Option<f64>, Option<f64>)>,
    velocity: f64,
    speed_mm_per_sec: f64,
    moving: Arc<AtomicBool>,
    events: broadcast::Sender<AxisEvent>,
}

impl MockAxis {
    /// Create a new mock axis at position 0.0, state `READY`.
    pub fn new(name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            position: Arc::new(RwLock::new(0.0)),
            states: Arc::new(RwLock::new(vec!["READY".to_string()])),
            limits: RwLock::new((None, None)),
            velocity: 2.0,
            speed_mm_per_sec: 1000.0,
            moving: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Set the initial position.
    pub fn with_position(self, position: f64) -> Self {
        *self.position.write() = position;
        self
    }

    /// Set the soft limits.
    pub fn with_limits(self, low: Option<f64>, high: Option<f64>) -> Self {
        *self.limits.write() = (low, high);
        self
    }

    /// Set the simulated motion speed [mm/s].
    pub fn with_speed(mut self, speed_mm_per_sec: f64) -> Self {
        self.speed_mm_per_sec = speed_mm_per_sec;
        self
    }

    /// Replace the backend state names and notify subscribers.
    pub fn set_state_names(&self, names: Vec<&str>) {
        let names: Vec<String> = names.into_iter().map(String::from).collect();
        *self.states.write() = names.clone();
        let _ = self.events.send(AxisEvent::StateChanged(names));
    }

    /// Emit a bare state-changed event with no state payload, as some
    /// backends do. Subscribers are expected to read the state back.
    pub fn notify_state_changed(&self) {
        let _ = self.events.send(AxisEvent::StateChanged(Vec::new()));
    }

    /// Overwrite the position and notify subscribers, bypassing motion
    /// simulation. Test hook for externally-driven position changes.
    pub fn set_position(&self, position: f64) {
        *self.position.write() = position;
        let _ = self.events.send(AxisEvent::PositionChanged(position));
    }

    fn finish_move(
        position: &RwLock<f64>,
        states: &RwLock<Vec<String>>,
        moving: &AtomicBool,
        events: &broadcast::Sender<AxisEvent>,
        target: f64,
    ) {
        // A stop request during travel leaves the position where it was.
        if moving.swap(false, Ordering::SeqCst) {
            *position.write() = target;
            let _ = events.send(AxisEvent::PositionChanged(target));
        }
        let ready = vec!["READY".to_string()];
        *states.write() = ready.clone();
        let _ = events.send(AxisEvent::StateChanged(ready));
        let _ = events.send(AxisEvent::MoveDone);
    }
}

#[async_trait]
impl Axis for MockAxis {
    fn name(&self) -> &str {
        &self.name
    }

    async fn position(&self) -> Result<f64> {
        Ok(*self.position.read())
    }

    async fn state_names(&self) -> Result<Vec<String>> {
        Ok(self.states.read().clone())
    }

    async fn limits(&self) -> Result<(Option<f64>, Option<f64>)> {
        Ok(*self.limits.read())
    }

    async fn velocity(&self) -> Result<f64> {
        Ok(self.velocity)
    }

    async fn move_to(&self, target: f64, wait: bool) -> Result<()> {
        {
            let (low, high) = *self.limits.read();
            if low.is_some_and(|low| target < low) || high.is_some_and(|high| target > high) {
                anyhow::bail!("target {target} outside soft limits");
            }
        }

        let current = *self.position.read();
        let travel =
            Duration::from_secs_f64(((target - current).abs() / self.speed_mm_per_sec).max(0.0));

        self.moving.store(true, Ordering::SeqCst);
        let names = vec!["MOVING".to_string()];
        *self.states.write() = names.clone();
        let _ = self.events.send(AxisEvent::StateChanged(names));

        if wait {
            sleep(travel).await;
            Self::finish_move(
                &self.position,
                &self.states,
                &self.moving,
                &self.events,
                target,
            );
        } else {
            let position = Arc::clone(&self.position);
            let states = Arc::clone(&self.states);
            let moving = Arc::clone(&self.moving);
            let events = self.events.clone();
            tokio::spawn(async move {
                sleep(travel).await;
                Self::finish_move(&position, &states, &moving, &events, target);
            });
        }
        Ok(())
    }

    async fn wait_move(&self) -> Result<()> {
        while self.moving.load(Ordering::SeqCst) {
            sleep(Duration::from_millis(5)).await;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.moving.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AxisEvent> {
        self.events.subscribe()
    }
}

/// Simulated photon-energy source.
///
/// Holds a settable energy reading [keV] and, optionally, a directly
/// exposed wavelength [Å] for tests that need exact conversion inputs.
pub struct MockEnergy {
    value: RwLock<Option<f64>>,
    wavelength: RwLock<Option<f64>>,
    events: broadcast::Sender<f64>,
}

impl MockEnergy {
    /// Create a source reading the given energy [keV].
    pub fn new(energy_kev: f64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            value: RwLock::new(Some(energy_kev)),
            wavelength: RwLock::new(None),
            events,
        }
    }

    /// Create a source with no reading at all.
    pub fn unavailable() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            value: RwLock::new(None),
            wavelength: RwLock::new(None),
            events,
        }
    }

    /// Expose an authoritative wavelength [Å] directly.
    pub fn with_wavelength(self, wavelength: f64) -> Self {
        *self.wavelength.write() = Some(wavelength);
        self
    }

    /// Update the energy reading [keV] and notify subscribers.
    pub fn set_value(&self, energy_kev: f64) {
        *self.value.write() = Some(energy_kev);
        let _ = self.events.send(energy_kev);
    }
}

impl EnergySource for MockEnergy {
    fn wavelength(&self) -> Option<f64> {
        *self.wavelength.read()
    }

    fn value(&self) -> Option<f64> {
        *self.value.read()
    }

    fn subscribe(&self) -> broadcast::Receiver<f64> {
        self.events.subscribe()
    }
}
