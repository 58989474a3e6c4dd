use std::fmt;

use hifitime::Epoch;

use crate::{
    constants::Magnitude,
    exposure_catalog::ExposureKey,
    star::ref_star::RefStar,
};

/// A star measured on one exposure.
///
/// `x`, `y` are expressed in the frame of the context that created the star: pixel
/// coordinates for freshly selected detections, degrees `(ra, dec)` once mapped on the
/// sky or when projected from a [`RefStar`]. `vx`, `vy`, `vxy` are the position
/// variances and covariance in the same units squared.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredStar {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub vxy: f64,
    pub flux: f64,
    pub flux_err: f64,
    /// Calibrated magnitude, when a photometric calibration was available.
    pub mag: Option<Magnitude>,
    /// Epoch of the exposure the star was measured on.
    pub epoch: Epoch,
    exposure: Option<ExposureKey>,
    valid: bool,
}

impl MeasuredStar {
    /// New measurement with null position variances.
    pub fn new(id: u64, x: f64, y: f64, flux: f64, flux_err: f64, epoch: Epoch) -> Self {
        MeasuredStar {
            id,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            vxy: 0.0,
            flux,
            flux_err,
            mag: None,
            epoch,
            exposure: None,
            valid: true,
        }
    }

    /// Measurement template located on a reference star, with null variances.
    pub fn from_ref_star(star: &RefStar, epoch: Epoch) -> Self {
        MeasuredStar::new(0, star.ra, star.dec, star.flux, star.flux_err, epoch)
    }

    pub fn with_variances(mut self, vx: f64, vy: f64, vxy: f64) -> Self {
        self.vx = vx;
        self.vy = vy;
        self.vxy = vxy;
        self
    }

    /// Exposure/chip this star was accumulated under, if any.
    pub fn exposure(&self) -> Option<ExposureKey> {
        self.exposure
    }

    pub(crate) fn tag_exposure(&mut self, key: ExposureKey) {
        self.exposure = Some(key);
    }

    /// Fits may use that to discard outliers.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn signal_to_noise(&self) -> f64 {
        self.flux / self.flux_err
    }

    /// Inverse of the magnitude variance, up to a constant factor.
    pub fn mag_weight(&self) -> f64 {
        (self.flux * self.flux) / (self.flux_err * self.flux_err)
    }

    /// `-2.5 log10(flux)`, `None` for a non-positive or non-finite flux.
    pub fn instrumental_mag(&self) -> Option<Magnitude> {
        if self.flux > 0.0 && self.flux.is_finite() {
            Some(-2.5 * self.flux.log10())
        } else {
            None
        }
    }
}

impl fmt::Display for MeasuredStar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} x={} y={} vx={:e} vy={:e} vxy={:e} flux={} fluxErr={}",
            self.id, self.x, self.y, self.vx, self.vy, self.vxy, self.flux, self.flux_err
        )?;
        if let Some(key) = self.exposure {
            write!(f, " exposure={key}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod measured_star_test {
    use super::*;
    use approx::assert_relative_eq;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_tai_at_midnight(2020, 3, 1)
    }

    #[test]
    fn test_photometry_helpers() {
        let star = MeasuredStar::new(7, 1.0, 2.0, 1000.0, 10.0, epoch());
        assert_eq!(star.signal_to_noise(), 100.0);
        assert_eq!(star.mag_weight(), 10000.0);
        assert_relative_eq!(star.instrumental_mag().unwrap(), -7.5, epsilon = 1e-12);

        let negative = MeasuredStar::new(8, 1.0, 2.0, -5.0, 1.0, epoch());
        assert_eq!(negative.instrumental_mag(), None);
    }

    #[test]
    fn test_exposure_tag_and_validity() {
        let mut star = MeasuredStar::new(1, 0.0, 0.0, 1.0, 1.0, epoch());
        assert!(star.exposure().is_none());
        assert!(star.is_valid());

        star.tag_exposure(ExposureKey::new(903334, 22));
        star.set_valid(false);
        assert_eq!(star.exposure(), Some(ExposureKey::new(903334, 22)));
        assert!(!star.is_valid());
        assert!(format!("{star}").contains("exposure=903334/22"));
    }
}
