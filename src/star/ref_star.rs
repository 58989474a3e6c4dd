use std::fmt;

use crate::{
    constants::{Degree, Years, RADEG},
    sky::normalize_ra,
    star::{measured_star::MeasuredStar, proper_motion::ProperMotion},
    starcal_errors::StarcalError,
};

/// A position/flux anchor from a reference catalog (e.g. Gaia).
///
/// The position is given at the catalog reference epoch; attach a [`ProperMotion`] to
/// move it to the epoch of a measurement. A reference star without proper motion is
/// considered static.
#[derive(Debug, Clone, PartialEq)]
pub struct RefStar {
    /// Right ascension in degrees, in `[0, 360)`
    pub ra: Degree,
    /// Declination in degrees, in `[-90, 90]`
    pub dec: Degree,
    pub flux: f64,
    pub flux_err: f64,
    proper_motion: Option<ProperMotion>,
}

impl RefStar {
    /// Create a static reference star.
    ///
    /// Arguments
    /// ---------
    /// * `ra`: right ascension in degrees, wrapped into `[0, 360)`
    /// * `dec`: declination in degrees
    /// * `flux`, `flux_err`: reference flux and its error
    ///
    /// Errors
    /// ------
    /// * [`StarcalError::InvalidCoordinates`] when `ra` is not finite or `dec` is outside
    ///   `[-90, 90]`.
    pub fn new(ra: Degree, dec: Degree, flux: f64, flux_err: f64) -> Result<Self, StarcalError> {
        if !ra.is_finite() || !(-90.0..=90.0).contains(&dec) {
            return Err(StarcalError::InvalidCoordinates(format!(
                "ra={ra}, dec={dec}"
            )));
        }
        Ok(RefStar {
            ra: normalize_ra(ra),
            dec,
            flux,
            flux_err,
            proper_motion: None,
        })
    }

    /// A reference star is usable for photometry when its flux is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.flux.is_finite() && self.flux >= 0.0
    }

    pub fn set_proper_motion(&mut self, proper_motion: ProperMotion) {
        self.proper_motion = Some(proper_motion);
    }

    pub fn with_proper_motion(mut self, proper_motion: ProperMotion) -> Self {
        self.proper_motion = Some(proper_motion);
        self
    }

    pub fn proper_motion(&self) -> Option<&ProperMotion> {
        self.proper_motion.as_ref()
    }

    /// Position of the star `dt` Julian years after the catalog epoch.
    pub fn position_at(&self, dt: Years) -> (Degree, Degree) {
        match &self.proper_motion {
            Some(pm) => pm.apply(self.ra, self.dec, dt),
            None => (self.ra, self.dec),
        }
    }

    /// Apply the proper motion of this reference star, returning a star with
    /// PM-corrected coordinates and coordinate errors.
    ///
    /// Arguments
    /// ---------
    /// * `star`: the measurement used as a template. Its position is never consulted;
    ///   its variances are the starting point of the error propagation.
    /// * `dt`: time elapsed from the catalog epoch to the measurement epoch, in Julian
    ///   years (negative to go back in time).
    ///
    /// Return
    /// ------
    /// * a copy of `star` located at the (projected) reference position. Without proper
    ///   motion the position is `(self.ra, self.dec)` and the variances are unchanged.
    ///   With a proper motion, the proper-motion errors are added to first order,
    ///   assuming they are independent of the template errors:
    ///   `vx += (σμα*·dt / cos δ)²`, `vy += (σμδ·dt)²`, `vxy += cov·dt² / cos δ`, all in deg².
    pub fn apply_proper_motion(&self, star: &MeasuredStar, dt: Years) -> MeasuredStar {
        let mut projected = star.clone();
        let (ra, dec) = self.position_at(dt);
        projected.x = ra;
        projected.y = dec;

        if let Some(pm) = &self.proper_motion {
            let cos_dec = (self.dec * RADEG).cos();
            let dt2 = dt * dt;
            projected.vx += (pm.ra_err * dt / cos_dec / RADEG).powi(2);
            projected.vy += (pm.dec_err * dt / RADEG).powi(2);
            projected.vxy += pm.ra_dec_cov * dt2 / cos_dec / (RADEG * RADEG);
        }
        projected
    }

    /// The same star moved `dt` years forward, with its proper motion re-expressed at
    /// the new position so that it can be moved again, including backwards.
    pub fn propagated(&self, dt: Years) -> RefStar {
        match &self.proper_motion {
            Some(pm) => {
                let ((ra, dec), moved_pm) = pm.transported(self.ra, self.dec, dt);
                RefStar {
                    ra,
                    dec,
                    flux: self.flux,
                    flux_err: self.flux_err,
                    proper_motion: Some(moved_pm),
                }
            }
            None => self.clone(),
        }
    }
}

impl fmt::Display for RefStar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ra={} dec={} flux={} fluxErr={}",
            self.ra, self.dec, self.flux, self.flux_err
        )?;
        if let Some(pm) = &self.proper_motion {
            write!(f, " ({pm})")?;
        }
        Ok(())
    }
}
