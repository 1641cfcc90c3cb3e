//! Detector geometry and resolution/distance conversion math.
//!
//! The resolution motor is built on a handful of closed-form relations
//! between sample-to-detector distance, beam centre, detector size and
//! X-ray wavelength:
//!
//! - beam centre is an affine function of distance, calibrated per
//!   detector: `x = d·ax + bx`, `y = d·ay + by`
//! - the usable detector radius is the minimum clearance from the beam
//!   centre to any of the four detector edges
//! - scattering angle `2θ = atan(radius / distance)` links distance to the
//!   achievable resolution `λ / (2·sin(2θ/2))`
//!
//! All conversions return `Option<f64>`: a domain error (asin argument out
//! of range, zero denominator, undefined wavelength) means the quantity is
//! *currently undefined*, not that the caller did something wrong. Callers
//! log and carry on.
//!
//! # Unit conventions
//!
//! Distances are mm, wavelengths and resolutions are Å, energies are keV
//! (values above [`ENERGY_EV_THRESHOLD`] are treated as eV and folded
//! down). The Å scale factor [`ANGSTROM_SCALE`] and the eV threshold are
//! kept verbatim from the station's historical calibration convention; do
//! not re-derive them from first principles.

use serde::{Deserialize, Serialize};

/// Planck constant [J·s].
const PLANCK: f64 = 6.626_070_15e-34;
/// Speed of light [m/s].
const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// Elementary charge [C].
const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// h·c/e, the conversion core between photon energy and wavelength.
pub(crate) const HC_OVER_E: f64 = PLANCK * SPEED_OF_LIGHT / ELEMENTARY_CHARGE;

/// Historical scale factor taking `(h·c/e)/E[keV]` to Å. Kept verbatim.
pub(crate) const ANGSTROM_SCALE: f64 = 10e6;

/// Energies above this are assumed to be eV and divided by 1000.
pub(crate) const ENERGY_EV_THRESHOLD: f64 = 1000.0;

/// Detector sensitive area [mm].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorGeometry {
    /// Detector width [mm].
    pub width: f64,
    /// Detector height [mm].
    pub height: f64,
}

/// Affine beam-centre calibration constants for one detector.
///
/// The beam centre moves with detector distance; `ax`/`ay` are the slopes
/// and `bx`/`by` the offsets of that motion, read from detector
/// configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BeamCalibration {
    pub ax: f64,
    pub bx: f64,
    pub ay: f64,
    pub by: f64,
}

impl BeamCalibration {
    /// Beam centre (x, y) [mm] at the given detector distance [mm].
    pub fn beam_centre(&self, distance: f64) -> (f64, f64) {
        (
            distance * self.ax + self.bx,
            distance * self.ay + self.by,
        )
    }
}

impl DetectorGeometry {
    /// Minimum clearance [mm] from the beam centre to any detector edge.
    ///
    /// This is the radius of the largest scattering circle fully contained
    /// on the detector; the edge nearest the beam centre limits it.
    pub fn radius(&self, beam_centre: (f64, f64)) -> f64 {
        let (beam_x, beam_y) = beam_centre;
        (self.width - beam_x)
            .min(self.height - beam_y)
            .min(beam_x)
            .min(beam_y)
    }

    /// Distance [mm] from the beam centre to the farthest detector corner.
    pub fn corner_distance(&self, beam_centre: (f64, f64)) -> f64 {
        let (beam_x, beam_y) = beam_centre;
        let corners = [
            (beam_x.powi(2) + beam_y.powi(2)).sqrt(),
            ((self.width - beam_x).powi(2) + beam_y.powi(2)).sqrt(),
            (beam_x.powi(2) + (self.height - beam_y).powi(2)).sqrt(),
            ((self.width - beam_x).powi(2) + (self.height - beam_y).powi(2)).sqrt(),
        ];
        corners.into_iter().fold(0.0, f64::max)
    }
}

/// Wavelength [Å] derived from a photon energy reading.
///
/// Applies the keV/eV normalization heuristic before scaling. Returns
/// `None` for a zero reading (no beam, nothing to derive).
pub fn wavelength_from_energy(energy: f64) -> Option<f64> {
    if energy == 0.0 {
        return None;
    }
    let energy_kev = if energy > ENERGY_EV_THRESHOLD {
        energy / 1000.0
    } else {
        energy
    };
    Some(HC_OVER_E / energy_kev * ANGSTROM_SCALE)
}

/// Wavelength [Å] from an energy already known to be keV.
///
/// Energy-change notifications carry keV by contract, so this skips the
/// threshold heuristic.
pub fn wavelength_from_kev(energy_kev: f64) -> f64 {
    HC_OVER_E / energy_kev * ANGSTROM_SCALE
}

/// Resolution [Å] achievable at the detector edge for the given radius
/// and distance [mm].
///
/// `None` when the scattering angle is zero or undefined (zero radius,
/// zero distance, non-finite inputs).
pub fn dist2res(wavelength: f64, radius: f64, distance: f64) -> Option<f64> {
    if distance == 0.0 {
        return None;
    }
    let two_theta = (radius / distance).atan();
    if two_theta == 0.0 || !two_theta.is_finite() {
        return None;
    }
    let resolution = wavelength / (2.0 * (two_theta / 2.0).sin());
    resolution.is_finite().then_some(resolution)
}

/// Distance [mm] guaranteeing the requested resolution [Å] everywhere on
/// the detector.
///
/// The scattering cone for the requested resolution must clear all four
/// detector edges; each edge yields a candidate distance through the
/// affine beam-centre relation, and the most restrictive (minimum) wins.
///
/// `None` on any mathematical failure: asin argument outside [-1, 1],
/// zero denominator, non-finite result.
pub fn res2dist(
    wavelength: f64,
    resolution: f64,
    geometry: &DetectorGeometry,
    beam: &BeamCalibration,
) -> Option<f64> {
    if resolution == 0.0 {
        return None;
    }
    let sine = wavelength / (2.0 * resolution);
    if !sine.is_finite() || sine.abs() > 1.0 {
        return None;
    }
    let two_theta = 2.0 * sine.asin();
    let tangent = two_theta.tan();

    let denominators = [
        tangent - beam.ax,
        tangent - beam.ay,
        tangent + beam.ax,
        tangent + beam.ay,
    ];
    if denominators.iter().any(|d| *d == 0.0) {
        return None;
    }

    let candidates = [
        beam.bx / (tangent - beam.ax),
        beam.by / (tangent - beam.ay),
        (geometry.width - beam.bx) / (tangent + beam.ax),
        (geometry.height - beam.by) / (tangent + beam.ay),
    ];
    if candidates.iter().any(|d| !d.is_finite()) {
        return None;
    }

    candidates.into_iter().reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAVELENGTH: f64 = 1.0;

    fn centred_detector() -> (DetectorGeometry, BeamCalibration) {
        (
            DetectorGeometry {
                width: 300.0,
                height: 300.0,
            },
            BeamCalibration {
                ax: 0.0,
                bx: 150.0,
                ay: 0.0,
                by: 150.0,
            },
        )
    }

    #[test]
    fn worked_example_beam_centred() {
        // width = height = 300mm, beam centred, distance 200mm, 1.0 Å:
        // radius 150mm, 2θ = atan(0.75), resolution ≈ 1.58 Å.
        let (geometry, beam) = centred_detector();
        let centre = beam.beam_centre(200.0);
        assert_eq!(centre, (150.0, 150.0));

        let radius = geometry.radius(centre);
        assert_eq!(radius, 150.0);

        let resolution = dist2res(WAVELENGTH, radius, 200.0).unwrap();
        assert!((resolution - 1.5811388).abs() < 1e-6, "got {resolution}");
    }

    #[test]
    fn distance_resolution_roundtrip() {
        let (geometry, beam) = centred_detector();
        for distance in [50.0, 120.0, 200.0, 431.7, 950.0] {
            let radius = geometry.radius(beam.beam_centre(distance));
            let resolution = dist2res(WAVELENGTH, radius, distance).unwrap();
            let back = res2dist(WAVELENGTH, resolution, &geometry, &beam).unwrap();
            assert!(
                (back - distance).abs() < 1e-9,
                "roundtrip {distance} -> {resolution} -> {back}"
            );
        }
    }

    #[test]
    fn roundtrip_with_sloped_beam_centre() {
        // Nonzero slope: beam centre moves with distance, so the per-edge
        // candidate denominators pick up the slope terms.
        let geometry = DetectorGeometry {
            width: 400.0,
            height: 440.0,
        };
        let beam = BeamCalibration {
            ax: 0.002,
            bx: 190.0,
            ay: -0.001,
            by: 225.0,
        };
        for distance in [150.0, 300.0, 600.0] {
            let radius = geometry.radius(beam.beam_centre(distance));
            let resolution = dist2res(WAVELENGTH, radius, distance).unwrap();
            let back = res2dist(WAVELENGTH, resolution, &geometry, &beam).unwrap();
            assert!(
                (back - distance).abs() < 1e-6,
                "roundtrip {distance} -> {resolution} -> {back}"
            );
        }
    }

    #[test]
    fn res2dist_selects_most_restrictive_edge() {
        // Beam centre deliberately closer to the left edge (bx = 100):
        // that edge's candidate bx/tan(2θ) must be the minimum.
        let geometry = DetectorGeometry {
            width: 300.0,
            height: 300.0,
        };
        let beam = BeamCalibration {
            ax: 0.0,
            bx: 100.0,
            ay: 0.0,
            by: 150.0,
        };
        let resolution = 2.0;
        let distance = res2dist(WAVELENGTH, resolution, &geometry, &beam).unwrap();

        let two_theta = 2.0 * (WAVELENGTH / (2.0 * resolution)).asin();
        let expected = 100.0 / two_theta.tan();
        assert!((distance - expected).abs() < 1e-9);
    }

    #[test]
    fn corner_is_farther_than_any_edge() {
        let (geometry, beam) = centred_detector();
        let centre = beam.beam_centre(200.0);
        let corner = geometry.corner_distance(centre);
        assert!((corner - (150.0f64 * 150.0 * 2.0).sqrt()).abs() < 1e-9);
        assert!(corner > geometry.radius(centre));
    }

    #[test]
    fn corner_resolution_is_finer_than_edge_resolution() {
        let (geometry, beam) = centred_detector();
        let centre = beam.beam_centre(200.0);
        let edge = dist2res(WAVELENGTH, geometry.radius(centre), 200.0).unwrap();
        let corner = dist2res(WAVELENGTH, geometry.corner_distance(centre), 200.0).unwrap();
        assert!(corner <= edge, "corner {corner} vs edge {edge}");
    }

    #[test]
    fn dist2res_domain_failures_are_none() {
        assert_eq!(dist2res(WAVELENGTH, 150.0, 0.0), None);
        assert_eq!(dist2res(WAVELENGTH, 0.0, 200.0), None);
        assert_eq!(dist2res(WAVELENGTH, f64::NAN, 200.0), None);
    }

    #[test]
    fn res2dist_domain_failures_are_none() {
        let (geometry, beam) = centred_detector();
        // asin argument above 1: requested resolution finer than λ/2 allows
        assert_eq!(res2dist(WAVELENGTH, 0.4, &geometry, &beam), None);
        assert_eq!(res2dist(WAVELENGTH, 0.0, &geometry, &beam), None);
    }

    #[test]
    fn wavelength_constants_reproduce_legacy_values() {
        // The Å scale factor and the eV threshold are the station's
        // historical convention, asserted verbatim.
        assert_eq!(ANGSTROM_SCALE, 10e6);
        assert_eq!(ENERGY_EV_THRESHOLD, 1000.0);

        // 12.3984 keV corresponds to 1.0 Å under this convention.
        let lambda = wavelength_from_energy(12.398419843320026).unwrap();
        assert!((lambda - 1.0).abs() < 1e-9, "got {lambda}");
    }

    #[test]
    fn energy_above_threshold_is_treated_as_ev() {
        let from_kev = wavelength_from_energy(12.4).unwrap();
        let from_ev = wavelength_from_energy(12_400.0).unwrap();
        assert!((from_kev - from_ev).abs() < 1e-12);
    }

    #[test]
    fn zero_energy_has_no_wavelength() {
        assert_eq!(wavelength_from_energy(0.0), None);
    }

    #[test]
    fn kev_path_skips_the_threshold_heuristic() {
        // 2000 "keV" stays keV on the notification path, while the
        // polling path would fold it to 2 keV.
        let direct = wavelength_from_kev(2000.0);
        let heuristic = wavelength_from_energy(2000.0).unwrap();
        assert!((heuristic / direct - 1000.0).abs() < 1e-6);
    }
}
