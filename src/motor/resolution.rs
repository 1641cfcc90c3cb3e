//! Resolution presented as a motor.
//!
//! The "position" of this motor is the crystallographic resolution [Å]
//! achievable at the detector edge, derived from the detector distance
//! axis, the detector geometry, the beam-centre calibration and the
//! current X-ray wavelength. Motion commands are converted to distance
//! moves on the underlying axis; distance and energy changes are relayed
//! back out as this motor's own signals.
//!
//! The cached resolution is never authoritative: it is re-derived on
//! every upstream change. A conversion that fails (missing wavelength,
//! arcsin domain, zero denominator) leaves the value `None` — "currently
//! undefined" — and is logged, never raised.

use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::DetectorConfig;
use crate::error::MotorError;
use crate::geometry::{self, BeamCalibration, DetectorGeometry};
use crate::hardware::energy::EnergySource;
use crate::motor::axis_motor::AxisMotor;
use crate::motor::state::MotorState;
use crate::motor::Motor;
use crate::signal::{MotorEvent, MotorSignal, SignalRegistry};

/// Virtual motor exposing detector resolution [Å].
///
/// Construct with [`ResolutionMotor::initialize`]; detector geometry is
/// mandatory and its absence is fatal. Must run inside a Tokio runtime
/// (it spawns the energy notification relay).
pub struct ResolutionMotor {
    inner: Arc<Inner>,
}

struct Inner {
    username: String,
    geometry: DetectorGeometry,
    beam: BeamCalibration,
    distance: Arc<AxisMotor>,
    energy: Arc<dyn EnergySource>,
    /// Cached resolution [Å]; `None` until first derived or when
    /// currently undefined.
    position: RwLock<Option<f64>>,
    /// Detector radius [mm] at the last seen distance.
    det_radius: RwLock<Option<f64>>,
    signals: SignalRegistry,
}

impl ResolutionMotor {
    /// Bind to the distance motor and energy source.
    ///
    /// `detector` comes from station configuration; `None` means the
    /// detector section is missing, which is fatal — no resolution can
    /// ever be computed without geometry.
    pub fn initialize(
        username: impl Into<String>,
        detector: Option<&DetectorConfig>,
        distance: Arc<AxisMotor>,
        energy: Arc<dyn EnergySource>,
    ) -> Result<Self, MotorError> {
        let detector = detector.ok_or(MotorError::MissingDetectorConfig)?;

        let inner = Arc::new(Inner {
            username: username.into(),
            geometry: detector.geometry,
            beam: detector.beam,
            distance,
            energy,
            position: RwLock::new(None),
            det_radius: RwLock::new(None),
            signals: SignalRegistry::new(),
        });
        Inner::connect_distance(&inner);
        Inner::spawn_energy_relay(&inner);
        Ok(Self { inner })
    }

    /// Beam centre (x, y) [mm] at the given distance.
    pub fn beam_centre(&self, distance: f64) -> (f64, f64) {
        self.inner.beam.beam_centre(distance)
    }

    /// Recompute and cache the detector radius [mm] for a distance.
    pub fn update_detector_radius(&self, distance: f64) -> f64 {
        self.inner.refresh_radius(distance)
    }

    /// Convert a distance [mm] to resolution [Å] using the cached
    /// detector radius.
    pub fn dist2res(&self, distance: f64) -> Option<f64> {
        let radius = (*self.inner.det_radius.read())?;
        let wavelength = self.inner.current_wavelength()?;
        geometry::dist2res(wavelength, radius, distance)
    }

    /// Convert a resolution [Å] to the distance [mm] guaranteeing it on
    /// the whole detector.
    pub fn res2dist(&self, resolution: f64) -> Option<f64> {
        let wavelength = self.inner.current_wavelength()?;
        geometry::res2dist(wavelength, resolution, &self.inner.geometry, &self.inner.beam)
    }

    /// Resolution [Å] at the detector corner farthest from the beam
    /// centre, at the current distance.
    pub async fn get_value_at_corner(&self) -> Result<Option<f64>> {
        let distance = self
            .inner
            .distance
            .get_value()
            .await?
            .ok_or(MotorError::Undefined("detector distance"))?;
        let centre = self.inner.beam.beam_centre(distance);
        let corner = self.inner.geometry.corner_distance(centre);
        let Some(wavelength) = self.inner.current_wavelength() else {
            return Ok(None);
        };
        Ok(geometry::dist2res(wavelength, corner, distance))
    }
}

impl Inner {
    /// React to distance-motor signals: echo state changes, re-derive the
    /// resolution on position changes.
    fn connect_distance(inner: &Arc<Inner>) {
        let weak = Arc::downgrade(inner);
        inner
            .distance
            .signals()
            .connect(MotorSignal::StateChanged, move |event| {
                let Some(inner) = weak.upgrade() else { return };
                if let MotorEvent::StateChanged(state) = event {
                    inner.signals.emit(&MotorEvent::StateChanged(*state));
                }
            });

        let weak: Weak<Inner> = Arc::downgrade(inner);
        inner
            .distance
            .signals()
            .connect(MotorSignal::PositionChanged, move |event| {
                let Some(inner) = weak.upgrade() else { return };
                if let MotorEvent::PositionChanged(Some(distance)) = event {
                    inner.update_distance(*distance);
                }
            });
    }

    /// React to energy changes [keV]: re-derive wavelength and
    /// resolution at the current distance.
    fn spawn_energy_relay(inner: &Arc<Inner>) {
        let weak = Arc::downgrade(inner);
        let mut events = inner.energy.subscribe();
        tokio::spawn(async move {
            loop {
                let energy = match events.recv().await {
                    Ok(energy) => energy,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "energy event relay lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                inner.update_energy(energy).await;
            }
        });
    }

    /// Distance changed: recompute beam centre, radius, resolution, and
    /// publish. An undefined result is published as `None`.
    fn update_distance(&self, distance: f64) {
        let radius = self.refresh_radius(distance);
        let resolution = self
            .current_wavelength()
            .and_then(|wavelength| geometry::dist2res(wavelength, radius, distance));
        if resolution.is_none() {
            warn!(distance, "resolution is undefined at this distance");
        }
        *self.position.write() = resolution;
        self.signals.emit(&MotorEvent::PositionChanged(resolution));
        self.signals.emit(&MotorEvent::ValueChanged(resolution));
    }

    /// Energy changed: recompute the wavelength from keV directly and the
    /// resolution at the current distance. Publishes only on success;
    /// failures are logged. Kept numerically in step with the
    /// distance-change path above.
    async fn update_energy(&self, energy_kev: f64) {
        let wavelength = geometry::wavelength_from_kev(energy_kev);
        let distance = match self.distance.get_value().await {
            Ok(Some(distance)) => distance,
            Ok(None) => return,
            Err(err) => {
                warn!(%err, "distance read failed during energy update");
                return;
            }
        };
        let radius = self.refresh_radius(distance);
        match geometry::dist2res(wavelength, radius, distance) {
            Some(resolution) => {
                *self.position.write() = Some(resolution);
                self.signals
                    .emit(&MotorEvent::PositionChanged(Some(resolution)));
                self.signals
                    .emit(&MotorEvent::ValueChanged(Some(resolution)));
            }
            None => warn!(energy_kev, "error while calculating resolution"),
        }
    }

    fn refresh_radius(&self, distance: f64) -> f64 {
        let radius = self.geometry.radius(self.beam.beam_centre(distance));
        *self.det_radius.write() = Some(radius);
        radius
    }

    /// Current wavelength [Å]: the source's own if it exposes one,
    /// otherwise derived from the energy reading.
    fn current_wavelength(&self) -> Option<f64> {
        if let Some(wavelength) = self.energy.wavelength() {
            return Some(wavelength);
        }
        self.energy
            .value()
            .and_then(geometry::wavelength_from_energy)
    }
}

#[async_trait]
impl Motor for ResolutionMotor {
    fn username(&self) -> &str {
        &self.inner.username
    }

    fn signals(&self) -> &SignalRegistry {
        &self.inner.signals
    }

    /// The state of the distance motor, echoed.
    async fn get_state(&self) -> Result<MotorState> {
        self.inner.distance.get_state().await
    }

    async fn get_value(&self) -> Result<Option<f64>> {
        if let Some(resolution) = *self.inner.position.read() {
            return Ok(Some(resolution));
        }
        let Some(distance) = self.inner.distance.get_value().await? else {
            return Ok(None);
        };
        let radius = self.inner.refresh_radius(distance);
        let resolution = self
            .inner
            .current_wavelength()
            .and_then(|wavelength| geometry::dist2res(wavelength, radius, distance));
        *self.inner.position.write() = resolution;
        Ok(resolution)
    }

    /// The inverse image of the distance limits under the
    /// distance→resolution conversion.
    async fn get_limits(&self) -> Result<(f64, f64)> {
        // Make sure a radius is cached before converting.
        if self.inner.det_radius.read().is_none() {
            if let Some(distance) = self.inner.distance.get_value().await? {
                self.inner.refresh_radius(distance);
            }
        }
        let (low, high) = self.inner.distance.get_limits().await?;
        match (self.dist2res(low), self.dist2res(high)) {
            (Some(low), Some(high)) => Ok((low, high)),
            _ => Err(MotorError::Undefined("resolution limits").into()),
        }
    }

    /// Convert the requested resolution to a distance and move the
    /// distance motor there, with the same wait/timeout semantics.
    async fn set_value(&self, value: f64, wait: bool, timeout: Option<Duration>) -> Result<()> {
        let distance = self
            .res2dist(value)
            .ok_or(MotorError::Undefined("target distance"))?;
        info!(
            resolution = value,
            distance_mm = distance,
            "moving {} to {value} ({distance} mm)",
            self.inner.username
        );
        self.inner.distance.set_value(distance, wait, timeout).await
    }

    async fn wait_move(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.distance.wait_move(timeout).await
    }

    /// Stop the real motor.
    async fn stop(&self) -> Result<()> {
        self.inner.distance.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::hardware::mock::{MockAxis, MockEnergy};

    fn centred_detector() -> DetectorConfig {
        DetectorConfig {
            geometry: DetectorGeometry {
                width: 300.0,
                height: 300.0,
            },
            beam: BeamCalibration {
                ax: 0.0,
                bx: 150.0,
                ay: 0.0,
                by: 150.0,
            },
        }
    }

    fn station(distance_mm: f64) -> (Arc<AxisMotor>, Arc<MockEnergy>) {
        let axis = Arc::new(MockAxis::new("dtox").with_position(distance_mm));
        let distance = Arc::new(AxisMotor::bind("Detector Distance", Some(1e-2), axis));
        let energy = Arc::new(MockEnergy::new(12.7).with_wavelength(1.0));
        (distance, energy)
    }

    #[tokio::test]
    async fn missing_detector_config_is_fatal() {
        let (distance, energy) = station(200.0);
        let result = ResolutionMotor::initialize("Resolution", None, distance, energy);
        assert!(matches!(result, Err(MotorError::MissingDetectorConfig)));
    }

    #[tokio::test]
    async fn value_matches_worked_example() {
        let (distance, energy) = station(200.0);
        let motor =
            ResolutionMotor::initialize("Resolution", Some(&centred_detector()), distance, energy)
                .unwrap();

        let resolution = motor.get_value().await.unwrap().unwrap();
        assert!((resolution - 1.5811388).abs() < 1e-6, "got {resolution}");
    }

    #[tokio::test]
    async fn value_is_cached_until_invalidated() {
        let (distance, energy) = station(200.0);
        let motor =
            ResolutionMotor::initialize("Resolution", Some(&centred_detector()), distance, energy)
                .unwrap();

        let first = motor.get_value().await.unwrap();
        let second = motor.get_value().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn undefined_without_energy() {
        let axis = Arc::new(MockAxis::new("dtox").with_position(200.0));
        let distance = Arc::new(AxisMotor::bind("Detector Distance", None, axis));
        let energy = Arc::new(MockEnergy::unavailable());
        let motor =
            ResolutionMotor::initialize("Resolution", Some(&centred_detector()), distance, energy)
                .unwrap();

        assert_eq!(motor.get_value().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corner_resolution_is_finer_than_edge() {
        let (distance, energy) = station(200.0);
        let motor =
            ResolutionMotor::initialize("Resolution", Some(&centred_detector()), distance, energy)
                .unwrap();

        let edge = motor.get_value().await.unwrap().unwrap();
        let corner = motor.get_value_at_corner().await.unwrap().unwrap();
        assert!(corner <= edge, "corner {corner} vs edge {edge}");
    }

    #[tokio::test]
    async fn echoes_distance_motor_state() {
        let axis = Arc::new(MockAxis::new("dtox").with_position(200.0));
        let distance = Arc::new(AxisMotor::bind("Detector Distance", None, Arc::clone(&axis) as Arc<dyn crate::hardware::axis::Axis>));
        let energy = Arc::new(MockEnergy::new(12.7));
        let motor = ResolutionMotor::initialize(
            "Resolution",
            Some(&centred_detector()),
            distance,
            energy,
        )
        .unwrap();

        axis.set_state_names(vec!["FAULT"]);
        assert_eq!(motor.get_state().await.unwrap(), MotorState::Fault);
    }
}
