#![allow(dead_code)]

use std::sync::Arc;

use hifitime::Epoch;
use rand::{rngs::StdRng, Rng};
use rand_distr::{Distribution, Normal};
use starcal::{
    catalog::{measurement_schema, Schema, SourceCatalog},
    config::CalibrationConfig,
    constants::{ARCSEC_PER_DEG, RADEG},
    star::{MeasuredStar, RefStar},
    ExposureKey, ProcessedExposure,
};

/// Square grid of static reference stars, `spacing` arcseconds apart, centered on `(ra, dec)`.
pub fn reference_grid(ra: f64, dec: f64, n_side: usize, spacing_arcsec: f64) -> Vec<RefStar> {
    let step = spacing_arcsec / ARCSEC_PER_DEG;
    let half = (n_side as f64 - 1.0) / 2.0;
    let mut stars = Vec::with_capacity(n_side * n_side);
    for i in 0..n_side {
        for j in 0..n_side {
            let star_dec = dec + (j as f64 - half) * step;
            let star_ra = ra + (i as f64 - half) * step / (star_dec * RADEG).cos();
            let mag = 15.0 + 5.0 * ((i * n_side + j) as f64 / (n_side * n_side) as f64);
            let flux = 10f64.powf(-0.4 * (mag - 30.0));
            stars.push(RefStar::new(star_ra, star_dec, flux, flux * 1e-3).unwrap());
        }
    }
    stars
}

/// One exposure observing every reference star with Gaussian noise.
///
/// Arguments
/// ---------
/// * `sigma_arcsec`: per-axis position noise
/// * `sigma_mag`: magnitude noise
pub fn noisy_exposure(
    rng: &mut StdRng,
    reference: &[RefStar],
    key: ExposureKey,
    epoch: Epoch,
    sigma_arcsec: f64,
    sigma_mag: f64,
) -> ProcessedExposure {
    let position_noise = Normal::new(0.0, sigma_arcsec / ARCSEC_PER_DEG).unwrap();
    let mag_noise = Normal::new(0.0, sigma_mag).unwrap();
    let stars = reference
        .iter()
        .enumerate()
        .map(|(id, r)| {
            let dec = r.dec + position_noise.sample(rng);
            let ra = r.ra + position_noise.sample(rng) / (r.dec * RADEG).cos();
            let flux = r.flux * 10f64.powf(-0.4 * mag_noise.sample(rng));
            MeasuredStar::new(id as u64, ra, dec, flux, flux / 1000.0, epoch)
        })
        .collect();
    ProcessedExposure::new(key, epoch, stars)
}

/// Schema of the detection catalogs with the default field names and bad flags.
pub fn default_schema() -> Arc<Schema> {
    let config = CalibrationConfig::default();
    let flags: Vec<&str> = config.bad_flags.iter().map(String::as_str).collect();
    Arc::new(
        measurement_schema(
            &config.source_flux_field,
            &config.centroid_field,
            &config.shape_field,
            &flags,
        )
        .unwrap(),
    )
}

/// Detection catalog with random fluxes, errors and centroids, including negative fluxes,
/// NaN errors and flagged sources.
pub fn random_catalog(rng: &mut StdRng, n: usize) -> SourceCatalog {
    let schema = default_schema();
    let key = |name: &str| schema.f64_key(name).unwrap();
    let flux = key("base_CircularApertureFlux_17_0_flux");
    let flux_err = key("base_CircularApertureFlux_17_0_fluxErr");
    let x = key("base_SdssCentroid_x");
    let y = key("base_SdssCentroid_y");
    let x_err = key("base_SdssCentroid_xErr");
    let y_err = key("base_SdssCentroid_yErr");
    let xx = key("base_SdssShape_xx");
    let yy = key("base_SdssShape_yy");
    let xy = key("base_SdssShape_xy");
    let cr = schema.flag_key("base_PixelFlags_flag_cr").unwrap();

    let mut catalog = SourceCatalog::new(Arc::clone(&schema));
    for id in 0..n {
        let mut record = catalog.empty_record(id as u64);
        record.set(flux, rng.random_range(-500.0..20_000.0));
        record.set(flux_err, rng.random_range(1.0..100.0));
        record.set(x, rng.random_range(0.0..2048.0));
        record.set(y, rng.random_range(0.0..4096.0));
        let sigma = |rng: &mut StdRng| {
            if rng.random::<f64>() < 0.1 {
                f64::NAN
            } else {
                rng.random_range(0.01..0.5)
            }
        };
        let sx = sigma(rng);
        let sy = sigma(rng);
        record.set(x_err, sx);
        record.set(y_err, sy);
        record.set(xx, rng.random_range(1.0..4.0));
        record.set(yy, rng.random_range(1.0..4.0));
        record.set(xy, rng.random_range(-2.0..2.0));
        record.set_flag(cr, rng.random::<f64>() < 0.2);
        record.n_peaks = if rng.random::<f64>() < 0.1 { 2 } else { 1 };
        catalog.push(record).unwrap();
    }
    catalog
}

/// Root mean square of a slice.
pub fn rms(values: &[f64]) -> f64 {
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}
