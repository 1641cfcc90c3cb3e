//! Custom error types for the beamline motor library.
//!
//! `MotorError` consolidates the failures a motor adapter can surface to its
//! callers. Arithmetic failures inside resolution/distance conversions are
//! deliberately *not* represented here: those recover locally as `None`
//! ("value currently undefined") and are only logged. See the `geometry`
//! module for that contract.
//!
//! Capability traits (`Axis`, `Motor`) use `anyhow::Result`, so variants of
//! this enum travel through `anyhow` and can be recovered with
//! `err.downcast_ref::<MotorError>()` where callers need to distinguish, for
//! example, a timeout from a hardware fault.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the motor adapters.
#[derive(Error, Debug)]
pub enum MotorError {
    /// The configured axis name is not present in the axis registry.
    #[error("axis '{0}' cannot be resolved")]
    UnresolvedAxis(String),

    /// Detector geometry / beam calibration is missing from the
    /// configuration. Fatal: a resolution motor can never compute a value
    /// without it.
    #[error("cannot get detector properties")]
    MissingDetectorConfig,

    /// A blocking wait on motion completion exceeded its deadline.
    #[error("execution timeout after {0:?}")]
    Timeout(Duration),

    /// A derived quantity cannot currently be computed (for example the
    /// distance equivalent of a requested resolution when the wavelength
    /// is unavailable).
    #[error("{0} is currently undefined")]
    Undefined(&'static str),

    /// The operation is not meaningful for this motor type.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// Semantic configuration error caught during validation.
    #[error("configuration error: {0}")]
    Config(String),
}
