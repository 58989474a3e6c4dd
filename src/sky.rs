//! # Spherical geometry helpers
//!
//! Conversions between equatorial coordinates and unit vectors, angular separations
//! and the gnomonic (tangent-plane) projection shared by every exposure of a
//! matching run.
//!
//! All public angles are in **degrees**; radians only appear internally.
use nalgebra::Vector3;

use crate::{
    constants::{Degree, DPI, RADEG},
    exposure_catalog::TangentPoint,
};

/// Wrap a right ascension into `[0, 360)`.
pub fn normalize_ra(ra: Degree) -> Degree {
    let wrapped = ra.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Unit vector pointing to `(ra, dec)` on the celestial sphere.
pub fn radec_to_unit_vector(ra: Degree, dec: Degree) -> Vector3<f64> {
    let (sin_ra, cos_ra) = (ra * RADEG).sin_cos();
    let (sin_dec, cos_dec) = (dec * RADEG).sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Local orthonormal basis `(e_ra, e_dec)` of the tangent plane at `(ra, dec)`.
///
/// `e_ra` points towards increasing right ascension (east), `e_dec` towards the north pole.
/// Both are defined at the poles, where `e_ra` follows the `ra` meridian convention.
pub fn local_basis(ra: Degree, dec: Degree) -> (Vector3<f64>, Vector3<f64>) {
    let (sin_ra, cos_ra) = (ra * RADEG).sin_cos();
    let (sin_dec, cos_dec) = (dec * RADEG).sin_cos();
    (
        Vector3::new(-sin_ra, cos_ra, 0.0),
        Vector3::new(-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec),
    )
}

/// Convert a direction vector into equatorial coordinates.
///
/// Arguments
/// ---------
/// * `position`: a 3D vector, not necessarily normalized
///
/// Return
/// ------
/// * `(ra, dec)` in degrees, `ra ∈ [0, 360)`. A zero vector maps to `(0, 0)` and a
///   vector along the polar axis to `ra = 0`.
pub fn unit_vector_to_radec(position: &Vector3<f64>) -> (Degree, Degree) {
    let norm = position.norm();
    if norm == 0. {
        return (0.0, 0.0);
    }

    let dec = (position.z / norm).clamp(-1.0, 1.0).asin();
    if position.x == 0.0 && position.y == 0.0 {
        return (0.0, dec / RADEG);
    }

    let alpha = position.y.atan2(position.x);
    let alpha = if alpha < 0.0 { alpha + DPI } else { alpha };
    (normalize_ra(alpha / RADEG), dec / RADEG)
}

/// Great-circle distance between two sky positions, in degrees.
///
/// Uses `atan2(|a × b|, a · b)` which keeps full precision for both tiny and
/// near-antipodal separations.
pub fn angular_separation(ra1: Degree, dec1: Degree, ra2: Degree, dec2: Degree) -> Degree {
    let a = radec_to_unit_vector(ra1, dec1);
    let b = radec_to_unit_vector(ra2, dec2);
    vector_separation(&a, &b)
}

/// Angle between two direction vectors, in degrees.
pub fn vector_separation(a: &Vector3<f64>, b: &Vector3<f64>) -> Degree {
    a.cross(b).norm().atan2(a.dot(b)) / RADEG
}

/// Gnomonic projection of `(ra, dec)` about the tangent point.
///
/// Return
/// ------
/// * `Some((xi, eta))` standard coordinates in degrees, `xi` towards the east and `eta`
///   towards the north, or `None` when the position lies on the far hemisphere where the
///   projection is undefined.
pub fn gnomonic_project(
    tangent_point: &TangentPoint,
    ra: Degree,
    dec: Degree,
) -> Option<(Degree, Degree)> {
    let center = radec_to_unit_vector(tangent_point.ra, tangent_point.dec);
    let (e_ra, e_dec) = local_basis(tangent_point.ra, tangent_point.dec);
    let p = radec_to_unit_vector(ra, dec);

    let cos_c = p.dot(&center);
    if cos_c <= 0.0 {
        return None;
    }
    Some((p.dot(&e_ra) / cos_c / RADEG, p.dot(&e_dec) / cos_c / RADEG))
}

/// Inverse of [`gnomonic_project`]: standard coordinates (degrees) back to `(ra, dec)`.
pub fn gnomonic_deproject(tangent_point: &TangentPoint, xi: Degree, eta: Degree) -> (Degree, Degree) {
    let center = radec_to_unit_vector(tangent_point.ra, tangent_point.dec);
    let (e_ra, e_dec) = local_basis(tangent_point.ra, tangent_point.dec);
    let p = center + e_ra * (xi * RADEG) + e_dec * (eta * RADEG);
    unit_vector_to_radec(&p)
}
