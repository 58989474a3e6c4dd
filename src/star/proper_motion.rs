use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{Degree, Radian, Years, RADMAS},
    sky::{local_basis, radec_to_unit_vector, unit_vector_to_radec},
};
use nalgebra::Vector3;

/// Proper motion of a reference star.
///
/// Units are radians per Julian year. The right ascension component follows the usual
/// catalog convention and already includes the `cos(dec)` factor: `ra` is
/// `μα·cos(δ)`, the rate of motion along the parallel, not the rate of change of the
/// right ascension coordinate.
///
/// The position transform ([`ProperMotion::apply`]) moves the star under a constant
/// space velocity perpendicular to the line of sight (zero radial velocity): the unit
/// vector `p` of the star is displaced by `v·dt`, with `v = μα*·e_α + μδ·e_δ` in the
/// local tangent basis, and renormalised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProperMotion {
    /// `μα·cos(δ)` in rad/yr
    pub ra: Radian,
    /// `μδ` in rad/yr
    pub dec: Radian,
    pub ra_err: Radian,
    pub dec_err: Radian,
    /// Covariance between the two components, in rad²/yr²
    pub ra_dec_cov: f64,
}

impl ProperMotion {
    /// Proper motion without correlation between the two components.
    ///
    /// Arguments
    /// ---------
    /// * `ra`: `μα·cos(δ)` in rad/yr
    /// * `dec`: `μδ` in rad/yr
    /// * `ra_err`, `dec_err`: one-sigma errors in rad/yr
    pub fn new(ra: Radian, dec: Radian, ra_err: Radian, dec_err: Radian) -> Self {
        ProperMotion {
            ra,
            dec,
            ra_err,
            dec_err,
            ra_dec_cov: 0.0,
        }
    }

    /// Same as [`ProperMotion::new`] with every value given in mas/yr.
    pub fn from_mas_per_year(ra: f64, dec: f64, ra_err: f64, dec_err: f64) -> Self {
        Self::new(ra * RADMAS, dec * RADMAS, ra_err * RADMAS, dec_err * RADMAS)
    }

    pub fn with_covariance(mut self, ra_dec_cov: f64) -> Self {
        self.ra_dec_cov = ra_dec_cov;
        self
    }

    /// Total angular rate, rad/yr.
    pub fn total(&self) -> Radian {
        self.ra.hypot(self.dec)
    }

    /// Position angle of the motion, measured from north through east, in radians.
    pub fn bearing(&self) -> Radian {
        self.ra.atan2(self.dec)
    }

    /// Velocity on the unit sphere at `(ra, dec)`, in rad/yr.
    pub fn velocity(&self, ra: Degree, dec: Degree) -> Vector3<f64> {
        let (e_ra, e_dec) = local_basis(ra, dec);
        e_ra * self.ra + e_dec * self.dec
    }

    /// Move the position `(ra, dec)` (degrees) by `dt` Julian years.
    ///
    /// `dt` may be negative. A null `dt` or a null motion returns the input position
    /// unchanged, bit for bit.
    pub fn apply(&self, ra: Degree, dec: Degree, dt: Years) -> (Degree, Degree) {
        if dt == 0.0 || (self.ra == 0.0 && self.dec == 0.0) {
            return (ra, dec);
        }
        let p = radec_to_unit_vector(ra, dec) + self.velocity(ra, dec) * dt;
        unit_vector_to_radec(&p)
    }

    /// Move the position by `dt` years and express this proper motion in the local
    /// basis of the new position.
    ///
    /// The space velocity is kept constant: the displaced vector `p + v·dt` is farther
    /// from the origin by a factor `n = |p + v·dt|`, so the angular rate seen from the
    /// new position is the tangential part of `v` divided by `n`.
    pub fn transported(&self, ra: Degree, dec: Degree, dt: Years) -> ((Degree, Degree), Self) {
        if dt == 0.0 || (self.ra == 0.0 && self.dec == 0.0) {
            return ((ra, dec), *self);
        }
        let v = self.velocity(ra, dec);
        let moved = radec_to_unit_vector(ra, dec) + v * dt;
        let n = moved.norm();
        let (new_ra, new_dec) = unit_vector_to_radec(&moved);
        let (e_ra, e_dec) = local_basis(new_ra, new_dec);

        let pm = ProperMotion {
            ra: v.dot(&e_ra) / n,
            dec: v.dot(&e_dec) / n,
            ..*self
        };
        ((new_ra, new_dec), pm)
    }
}

impl fmt::Display for ProperMotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pm_ra*cos(dec)={:.3} mas/yr, pm_dec={:.3} mas/yr, pm_raErr={:.3}, pm_decErr={:.3}, pm_raDecCov={:e}",
            self.ra / RADMAS,
            self.dec / RADMAS,
            self.ra_err / RADMAS,
            self.dec_err / RADMAS,
            self.ra_dec_cov
        )
    }
}
