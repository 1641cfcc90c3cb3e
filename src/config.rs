//! Station configuration loading.
//!
//! Strongly-typed configuration loaded from a TOML file with
//! `BEAMLINE_`-prefixed environment-variable overrides:
//!
//! ```toml
//! [motors.dtox]
//! username = "Detector Distance"
//! axis = "dtox"
//! tolerance = 1e-2
//!
//! [detector]
//! width = 423.6
//! height = 434.6
//!
//! [detector.beam]
//! ax = 0.0
//! bx = 211.8
//! ay = 0.0
//! by = 217.3
//! ```
//!
//! The `[detector]` section is optional at load time — stations without a
//! resolution motor do not need it — but constructing a resolution motor
//! without it is a fatal error.

use std::collections::BTreeMap;
use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::MotorError;
use crate::geometry::{BeamCalibration, DetectorGeometry};

/// Environment-variable prefix for overrides, e.g.
/// `BEAMLINE_DETECTOR_WIDTH=423.6`.
const ENV_PREFIX: &str = "BEAMLINE_";

/// Top-level station configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Motor definitions, keyed by motor id.
    #[serde(default)]
    pub motors: BTreeMap<String, MotorConfig>,
    /// Detector geometry and beam calibration, required for the
    /// resolution motor.
    pub detector: Option<DetectorConfig>,
}

/// One motor entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorConfig {
    /// Human-readable label. Defaults to the axis name.
    pub username: Option<String>,
    /// Backend axis name this motor binds to.
    pub axis: String,
    /// Position tolerance [device units].
    pub tolerance: Option<f64>,
}

/// Detector section: sensitive area plus beam-centre calibration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Width and height [mm].
    #[serde(flatten)]
    pub geometry: DetectorGeometry,
    /// Affine beam-centre calibration constants.
    pub beam: BeamCalibration,
}

impl StationConfig {
    /// Load configuration from a TOML file, with environment overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("_"))
            .extract()
    }

    /// Semantic validation after loading.
    pub fn validate(&self) -> Result<(), MotorError> {
        for (id, motor) in &self.motors {
            if motor.axis.is_empty() {
                return Err(MotorError::Config(format!(
                    "motor '{id}' has an empty axis name"
                )));
            }
            if motor.tolerance.is_some_and(|tol| tol <= 0.0) {
                return Err(MotorError::Config(format!(
                    "motor '{id}' tolerance must be positive"
                )));
            }
        }
        if let Some(detector) = &self.detector {
            if detector.geometry.width <= 0.0 || detector.geometry.height <= 0.0 {
                return Err(MotorError::Config(
                    "detector width/height must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}
