//! # Calibration statistics
//!
//! Quality metrics of an astrometric/photometric calibration, computed from the
//! processed exposures (stars placed on the sky by their fitted mapping) and a
//! reference catalog:
//!
//! * **absolute astrometry** – RMS separation between each measured star and the nearest
//!   reference star, the reference being moved by its proper motion to the epoch of the
//!   exposure ([`RefStar::position_at`]);
//! * **relative astrometry** – RMS separation of repeat detections of the same star from
//!   their centroid, independent of the reference catalog;
//! * **PA1** – photometric repeatability, the robust RMS of the magnitude residuals of
//!   bright repeat detections from their per-star mean.
//!
//! Associations use the `match_radius_arcsec` of the [`CalibrationConfig`]. Unmatched
//! detections are excluded, never treated as errors. A metric that cannot be computed
//! (no match, no repeat star) is `None`.
//!
//! Estimators
//! -----------------
//! * With Gaussian per-axis position noise `σ` on the measured stars, `dist_absolute`
//!   tends to `σ·√2`.
//! * Repeat stars are associated with a friends-of-centroid walk over the exposures in
//!   input order: a detection joins the group with the nearest running centroid within
//!   the radius, else seeds a new group. With `n` detections per star, `dist_relative`
//!   tends to `σ·√(2(n−1)/n)`.
//! * PA1 keeps detections with `flux / flux_err > flux_limit`, stars with at least two
//!   such detections, clips stars with a scatter above `max_mag_scatter` and keeps the
//!   `bright_fraction` brightest of the rest before taking `0.7413 × IQR` of the pooled
//!   residuals (each scaled by `√(n/(n−1))`).
pub(crate) mod crossmatch;
pub(crate) mod photometry;

use std::fmt;

use hifitime::Epoch;
use nalgebra::Vector3;
use tracing::debug;

use crate::{
    config::CalibrationConfig,
    constants::{ArcSec, Magnitude, Years, ARCSEC_PER_DEG},
    exposure_catalog::ExposureKey,
    sky::{radec_to_unit_vector, vector_separation},
    star::{epoch_delta_years, MeasuredStar, RefStar},
    wcs::SkyMapping,
};

use self::{
    crossmatch::{group_positions, PointIndex},
    photometry::RepeatMagnitudes,
};

/// The stars of one exposure/chip placed on the sky by the fitted mapping.
///
/// `x`, `y` of the stars are `ra`, `dec` in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedExposure {
    pub key: ExposureKey,
    pub epoch: Epoch,
    pub stars: Vec<MeasuredStar>,
}

impl ProcessedExposure {
    pub fn new(key: ExposureKey, epoch: Epoch, stars: Vec<MeasuredStar>) -> Self {
        ProcessedExposure { key, epoch, stars }
    }

    /// Map stars measured in pixels on the sky.
    pub fn from_mapping<M: SkyMapping + ?Sized>(
        key: ExposureKey,
        epoch: Epoch,
        stars: &[MeasuredStar],
        mapping: &M,
    ) -> Self {
        ProcessedExposure {
            key,
            epoch,
            stars: stars.iter().map(|s| mapping.map_star(s)).collect(),
        }
    }
}

/// Result of [`compute_rms`]. Distances in arcseconds, PA1 in magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RmsStatistics {
    pub dist_relative: Option<ArcSec>,
    pub dist_absolute: Option<ArcSec>,
    pub pa1: Option<Magnitude>,
    /// Number of measured stars matched to a reference star.
    pub n_absolute_matches: usize,
    /// Number of stars detected at least twice.
    pub n_repeat_stars: usize,
    /// Number of stars PA1 was computed from.
    pub n_pa1_stars: usize,
}

fn write_mas(f: &mut fmt::Formatter<'_>, value: Option<ArcSec>) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{:.3} mas", v * 1000.0),
        None => write!(f, "undefined"),
    }
}

fn write_mag(f: &mut fmt::Formatter<'_>, value: Option<Magnitude>) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{v:.5} mag"),
        None => write!(f, "undefined"),
    }
}

impl fmt::Display for RmsStatistics {
    /// Compact by default; multi-line table with the alternate flag (`{:#}`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Calibration statistics")?;
            writeln!(f, "----------------------")?;
            write!(f, "dist_relative : ")?;
            write_mas(f, self.dist_relative)?;
            writeln!(f, " ({} repeat stars)", self.n_repeat_stars)?;
            write!(f, "dist_absolute : ")?;
            write_mas(f, self.dist_absolute)?;
            writeln!(f, " ({} matches)", self.n_absolute_matches)?;
            write!(f, "pa1           : ")?;
            write_mag(f, self.pa1)?;
            write!(f, " ({} stars)", self.n_pa1_stars)
        } else {
            write!(f, "dist_relative=")?;
            write_mas(f, self.dist_relative)?;
            write!(f, ", dist_absolute=")?;
            write_mas(f, self.dist_absolute)?;
            write!(f, ", pa1=")?;
            write_mag(f, self.pa1)
        }
    }
}

fn rms(sum_sq: f64, n: usize) -> Option<f64> {
    (n > 0).then(|| (sum_sq / n as f64).sqrt())
}

/// RMS separation (arcsec) of measured stars from their projected reference star.
fn absolute_rms(
    processed: &[ProcessedExposure],
    reference: &[RefStar],
    reference_epoch: Epoch,
    radius_deg: f64,
) -> (Option<ArcSec>, usize) {
    let mut cached: Option<(Years, PointIndex)> = None;
    let mut sum_sq = 0.0;
    let mut n = 0usize;

    for exposure in processed {
        let dt = epoch_delta_years(reference_epoch, exposure.epoch);
        if cached.as_ref().map_or(true, |(cached_dt, _)| *cached_dt != dt) {
            let points = reference
                .iter()
                .map(|r| {
                    let (ra, dec) = r.position_at(dt);
                    radec_to_unit_vector(ra, dec)
                })
                .collect();
            cached = Some((dt, PointIndex::new(points, radius_deg)));
        }
        let Some((_, index)) = cached.as_ref() else {
            continue;
        };

        for star in exposure.stars.iter().filter(|s| s.is_valid()) {
            if let Some((_, sep)) = index.nearest(&radec_to_unit_vector(star.x, star.y)) {
                let sep = sep * ARCSEC_PER_DEG;
                sum_sq += sep * sep;
                n += 1;
            }
        }
    }
    (rms(sum_sq, n), n)
}

/// Compute the calibration statistics.
///
/// Arguments
/// ---------
/// * `processed`: the exposures, in the order used to associate repeat detections
/// * `reference`: reference catalog, positions at `reference_epoch`
/// * `reference_epoch`: epoch of the reference positions
/// * `config`: radius and PA1 options
///
/// Return
/// ------
/// * the [`RmsStatistics`]; metrics that cannot be computed are `None`.
pub fn compute_rms(
    processed: &[ProcessedExposure],
    reference: &[RefStar],
    reference_epoch: Epoch,
    config: &CalibrationConfig,
) -> RmsStatistics {
    let radius_deg = config.match_radius_arcsec / ARCSEC_PER_DEG;

    let (dist_absolute, n_absolute_matches) =
        absolute_rms(processed, reference, reference_epoch, radius_deg);

    let stars: Vec<&MeasuredStar> = processed
        .iter()
        .flat_map(|e| e.stars.iter())
        .filter(|s| s.is_valid())
        .collect();
    let positions: Vec<Vector3<f64>> = stars
        .iter()
        .map(|s| radec_to_unit_vector(s.x, s.y))
        .collect();
    let groups = group_positions(&positions, radius_deg);

    let mut sum_sq = 0.0;
    let mut n_members = 0usize;
    let mut n_repeat_stars = 0usize;
    let mut repeats = Vec::new();
    for group in groups.iter().filter(|g| g.members.len() >= 2) {
        n_repeat_stars += 1;
        let centroid = group.centroid();
        for &m in &group.members {
            let sep = vector_separation(&positions[m], &centroid) * ARCSEC_PER_DEG;
            sum_sq += sep * sep;
            n_members += 1;
        }

        let mags: Vec<Magnitude> = group
            .members
            .iter()
            .map(|&m| stars[m])
            .filter(|s| s.signal_to_noise() > config.flux_limit)
            .filter_map(MeasuredStar::instrumental_mag)
            .collect();
        repeats.extend(RepeatMagnitudes::new(&mags));
    }

    let (pa1, n_pa1_stars) =
        match photometry::pa1(repeats, config.max_mag_scatter, config.bright_fraction) {
            Some((value, n)) => (Some(value), n),
            None => (None, 0),
        };

    let statistics = RmsStatistics {
        dist_relative: rms(sum_sq, n_members),
        dist_absolute,
        pa1,
        n_absolute_matches,
        n_repeat_stars,
        n_pa1_stars,
    };
    debug!("{statistics}");
    statistics
}

#[cfg(test)]
mod statistics_test {
    use super::*;
    use crate::constants::MAS_PER_DEG;
    use approx::assert_abs_diff_eq;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_tai_at_midnight(2020, 1, 1)
    }

    fn star(id: u64, ra: f64, dec: f64, flux: f64) -> MeasuredStar {
        MeasuredStar::new(id, ra, dec, flux, flux / 1000.0, epoch())
    }

    #[test]
    fn test_no_match_is_undefined() {
        let config = CalibrationConfig::default();
        let stats = compute_rms(&[], &[], epoch(), &config);
        assert_eq!(stats, RmsStatistics::default());

        let exposure = ProcessedExposure::new(
            ExposureKey::new(1, 0),
            epoch(),
            vec![star(0, 10.0, 10.0, 1e4)],
        );
        let far = RefStar::new(20.0, 10.0, 1.0, 0.1).unwrap();
        let stats = compute_rms(&[exposure], &[far], epoch(), &config);
        assert_eq!(stats.dist_absolute, None);
        assert_eq!(stats.n_absolute_matches, 0);
        assert_eq!(stats.dist_relative, None);
        assert_eq!(stats.pa1, None);
    }

    #[test]
    fn test_known_offsets() {
        let config = CalibrationConfig::default();
        let reference = vec![
            RefStar::new(30.0, 0.0, 1.0, 0.1).unwrap(),
            RefStar::new(30.1, 0.0, 1.0, 0.1).unwrap(),
        ];
        // 300 mas and 400 mas north of the references
        let offset = |mas: f64| mas / MAS_PER_DEG;
        let e1 = ProcessedExposure::new(
            ExposureKey::new(1, 0),
            epoch(),
            vec![
                star(0, 30.0, offset(300.0), 1e4),
                star(1, 30.1, offset(400.0), 1e4),
            ],
        );
        let e2 = ProcessedExposure::new(
            ExposureKey::new(2, 0),
            epoch(),
            vec![star(0, 30.0, -offset(300.0), 1e4)],
        );
        let stats = compute_rms(&[e1, e2], &reference, epoch(), &config);

        assert_eq!(stats.n_absolute_matches, 3);
        let expected = ((0.09 + 0.16 + 0.09) / 3.0f64).sqrt();
        assert_abs_diff_eq!(stats.dist_absolute.unwrap(), expected, epsilon = 1e-9);

        // one repeat star, both detections 300 mas from their centroid
        assert_eq!(stats.n_repeat_stars, 1);
        assert_abs_diff_eq!(stats.dist_relative.unwrap(), 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_reference_moved_to_exposure_epoch() {
        let config = CalibrationConfig::default();
        let reference_epoch = Epoch::from_gregorian_tai_at_midnight(2000, 1, 1);
        // 1 arcsec/yr northwards, observed 20 years later
        let reference = vec![RefStar::new(100.0, 0.0, 1.0, 0.1)
            .unwrap()
            .with_proper_motion(crate::star::ProperMotion::from_mas_per_year(
                0.0, 1000.0, 0.0, 0.0,
            ))];
        let dt = epoch_delta_years(reference_epoch, epoch());
        let (ra, dec) = reference[0].position_at(dt);
        let exposure =
            ProcessedExposure::new(ExposureKey::new(1, 0), epoch(), vec![star(0, ra, dec, 1e4)]);

        let stats = compute_rms(&[exposure.clone()], &reference, reference_epoch, &config);
        assert_abs_diff_eq!(stats.dist_absolute.unwrap(), 0.0, epsilon = 1e-6);

        // ignoring the proper motion, the star is ~20 arcsec away: no match
        let stats = compute_rms(&[exposure], &reference, epoch(), &config);
        assert_eq!(stats.dist_absolute, None);
    }

    #[test]
    fn test_pa1_on_repeat_stars() {
        let config = CalibrationConfig::default();
        let flux = |mag: f64| 10f64.powf(-0.4 * mag);
        let e1 = ProcessedExposure::new(
            ExposureKey::new(1, 0),
            epoch(),
            vec![star(0, 40.0, 5.0, flux(-10.0)), star(1, 40.5, 5.0, flux(-11.0))],
        );
        let e2 = ProcessedExposure::new(
            ExposureKey::new(2, 0),
            epoch(),
            vec![star(0, 40.0, 5.0, flux(-10.02)), star(1, 40.5, 5.0, flux(-11.02))],
        );
        let stats = compute_rms(&[e1, e2], &[], epoch(), &config);
        assert_eq!(stats.n_repeat_stars, 2);
        // bright half of 2 stars
        assert_eq!(stats.n_pa1_stars, 1);
        // residuals +-0.01 sqrt(2), interpolated IQR is 0.01 sqrt(2)
        let expected = crate::constants::IQR_TO_SIGMA * 0.01 * std::f64::consts::SQRT_2;
        assert_abs_diff_eq!(stats.pa1.unwrap(), expected, epsilon = 1e-9);
        assert_eq!(stats.dist_absolute, None);
    }

    #[test]
    fn test_low_signal_to_noise_excluded_from_pa1() {
        let config = CalibrationConfig::default();
        let faint = |id, ra| MeasuredStar::new(id, ra, 5.0, 1000.0, 20.0, epoch());
        let e1 = ProcessedExposure::new(ExposureKey::new(1, 0), epoch(), vec![faint(0, 40.0)]);
        let e2 = ProcessedExposure::new(ExposureKey::new(2, 0), epoch(), vec![faint(0, 40.0)]);
        let stats = compute_rms(&[e1, e2], &[], epoch(), &config);
        assert_eq!(stats.n_repeat_stars, 1);
        assert_eq!(stats.pa1, None);
        assert_eq!(stats.n_pa1_stars, 0);
    }

    #[test]
    fn test_display() {
        let stats = RmsStatistics {
            dist_relative: Some(0.012),
            dist_absolute: None,
            pa1: Some(0.01),
            n_absolute_matches: 0,
            n_repeat_stars: 4,
            n_pa1_stars: 2,
        };
        assert_eq!(
            format!("{stats}"),
            "dist_relative=12.000 mas, dist_absolute=undefined, pa1=0.01000 mag"
        );
        assert!(format!("{stats:#}").contains("dist_absolute : undefined (0 matches)"));
    }
}
