//! Hardware capability interfaces consumed by the motor adapters.
//!
//! The adapters never talk to controllers directly; they see an [`Axis`]
//! (one motorized degree of freedom), an [`EnergySource`] (current photon
//! energy / wavelength) and nothing else. Mock implementations live in
//! [`mock`] for tests and the station simulator.

pub mod axis;
pub mod energy;
pub mod mock;

pub use axis::{Axis, AxisEvent, AxisRegistry};
pub use energy::EnergySource;
