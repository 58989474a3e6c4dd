//! # Pixel to sky mappings
//!
//! The astrometric solver is external to this crate: it consumes the accumulated
//! [`ExposureCatalog`] through the [`AstrometrySolver`] trait and hands back one
//! [`SkyMapping`] per exposure/chip. The statistics engine only needs that mapping to
//! place the measured stars on the sky.
//!
//! [`TanWcs`] is the plain FITS `TAN` world coordinate system (CRVAL, CRPIX and a CD
//! matrix); it is the mapping used for already processed exposures and for tests.
use std::collections::BTreeMap;

use nalgebra::{Matrix2, Vector2};

use crate::{
    config::CalibrationConfig,
    constants::{Degree, RADEG},
    exposure_catalog::{ExposureCatalog, ExposureKey, TangentPoint},
    sky::{gnomonic_deproject, gnomonic_project},
    star::MeasuredStar,
    starcal_errors::StarcalError,
};

/// Mapping from the pixel frame of one chip to equatorial coordinates.
pub trait SkyMapping {
    /// `(ra, dec)` in degrees of the pixel position `(x, y)`.
    fn pixel_to_sky(&self, x: f64, y: f64) -> (Degree, Degree);

    /// Local linear part of the mapping at `(x, y)`, in degrees of the tangent plane per pixel.
    ///
    /// Used to carry the pixel covariance to the sky; the default is a centered finite
    /// difference of [`SkyMapping::pixel_to_sky`].
    fn local_jacobian(&self, x: f64, y: f64) -> Matrix2<f64> {
        let (ra0, dec0) = self.pixel_to_sky(x, y);
        let tp = TangentPoint { ra: ra0, dec: dec0 };
        let step = 0.5;
        let column = |dx: f64, dy: f64| {
            let (ra_p, dec_p) = self.pixel_to_sky(x + dx, y + dy);
            let (ra_m, dec_m) = self.pixel_to_sky(x - dx, y - dy);
            let p = gnomonic_project(&tp, ra_p, dec_p).unwrap_or((0.0, 0.0));
            let m = gnomonic_project(&tp, ra_m, dec_m).unwrap_or((0.0, 0.0));
            Vector2::new(p.0 - m.0, p.1 - m.1) / (2.0 * step)
        };
        Matrix2::from_columns(&[column(step, 0.0), column(0.0, step)])
    }

    /// Place a star measured in pixels on the sky.
    ///
    /// The returned star has `x = ra`, `y = dec` in degrees; its covariance is carried
    /// through the local Jacobian, then the right ascension variance is expressed on the
    /// coordinate itself (divided by `cos² dec`).
    fn map_star(&self, star: &MeasuredStar) -> MeasuredStar {
        let (ra, dec) = self.pixel_to_sky(star.x, star.y);
        let jacobian = self.local_jacobian(star.x, star.y);
        let cov = Matrix2::new(star.vx, star.vxy, star.vxy, star.vy);
        let sky_cov = jacobian * cov * jacobian.transpose();
        let cos_dec = (dec * RADEG).cos();

        let mut mapped = star.clone();
        mapped.x = ra;
        mapped.y = dec;
        mapped.vx = sky_cov[(0, 0)] / (cos_dec * cos_dec);
        mapped.vy = sky_cov[(1, 1)];
        mapped.vxy = sky_cov[(0, 1)] / cos_dec;
        mapped
    }
}

/// Gnomonic world coordinate system.
///
/// `(xi, eta) = CD · (pixel - CRPIX)` are the standard coordinates in degrees about
/// `CRVAL`.
#[derive(Debug, Clone, PartialEq)]
pub struct TanWcs {
    pub crval: TangentPoint,
    pub crpix: Vector2<f64>,
    /// Degrees per pixel.
    pub cd: Matrix2<f64>,
}

impl TanWcs {
    pub fn new(crval: TangentPoint, crpix: Vector2<f64>, cd: Matrix2<f64>) -> Self {
        TanWcs { crval, crpix, cd }
    }

    /// Square pixels of `scale` arcseconds, north up and east left (`x` increases westwards).
    pub fn with_pixel_scale(crval: TangentPoint, crpix: Vector2<f64>, scale_arcsec: f64) -> Self {
        let s = scale_arcsec / 3600.0;
        TanWcs::new(crval, crpix, Matrix2::new(-s, 0.0, 0.0, s))
    }

    /// Inverse mapping, `None` for a singular CD matrix or a position on the far hemisphere.
    pub fn sky_to_pixel(&self, ra: Degree, dec: Degree) -> Option<(f64, f64)> {
        let (xi, eta) = gnomonic_project(&self.crval, ra, dec)?;
        let inverse = self.cd.try_inverse()?;
        let pixel = inverse * Vector2::new(xi, eta) + self.crpix;
        Some((pixel.x, pixel.y))
    }
}

impl SkyMapping for TanWcs {
    fn pixel_to_sky(&self, x: f64, y: f64) -> (Degree, Degree) {
        let standard = self.cd * (Vector2::new(x, y) - self.crpix);
        gnomonic_deproject(&self.crval, standard.x, standard.y)
    }
}

/// External astrometric solver, fitting one mapping per exposure/chip.
pub trait AstrometrySolver {
    type Mapping: SkyMapping;

    /// Fit the mappings of every exposure of `catalog`.
    ///
    /// The catalog is read-only and its tangent point is frozen. Implementations report
    /// their own failures as [`StarcalError::SolverFailure`].
    fn fit(
        &mut self,
        catalog: &ExposureCatalog,
        config: &CalibrationConfig,
    ) -> Result<BTreeMap<ExposureKey, Self::Mapping>, StarcalError>;
}
