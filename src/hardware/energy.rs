//! Energy source capability trait.

use tokio::sync::broadcast;

/// The beamline's photon-energy source as seen by the resolution motor.
///
/// Property reads are synchronous: energy sources keep a last-known
/// reading available at all times, so no I/O happens here.
///
/// `wavelength()` is the authoritative wavelength [Å] where the source
/// exposes one directly; the default says it does not, and callers derive
/// the wavelength from `value()` instead (keV/eV heuristic included).
pub trait EnergySource: Send + Sync {
    /// Directly measured wavelength [Å], if this source exposes one.
    fn wavelength(&self) -> Option<f64> {
        None
    }

    /// Current photon energy reading. Nominally keV; readings above the
    /// eV threshold are normalized by the consumer. `None` when no
    /// reading is available.
    fn value(&self) -> Option<f64>;

    /// Subscribe to energy-change notifications [keV].
    fn subscribe(&self) -> broadcast::Receiver<f64>;
}
