use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hifitime::Epoch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use starcal::{
    compute_rms,
    config::CalibrationConfig,
    constants::{ARCSEC_PER_DEG, RADEG},
    star::{MeasuredStar, ProperMotion, RefStar},
    ExposureKey, ProcessedExposure,
};

/// Reference grid with random proper motions, `n_side²` stars 20 arcsec apart.
fn reference(rng: &mut StdRng, n_side: usize) -> Vec<RefStar> {
    let step = 20.0 / ARCSEC_PER_DEG;
    (0..n_side * n_side)
        .map(|i| {
            let dec = 10.0 + (i / n_side) as f64 * step;
            let ra = 120.0 + (i % n_side) as f64 * step / (dec * RADEG).cos();
            let pm = ProperMotion::from_mas_per_year(
                rng.random_range(-20.0..20.0),
                rng.random_range(-20.0..20.0),
                0.1,
                0.1,
            );
            RefStar::new(ra, dec, 1e5, 1e2).unwrap().with_proper_motion(pm)
        })
        .collect()
}

/// Exposures observing every reference star with uniform noise of +-0.1 arcsec.
fn exposures(
    rng: &mut StdRng,
    reference: &[RefStar],
    reference_epoch: Epoch,
    n_visits: u64,
) -> Vec<ProcessedExposure> {
    (0..n_visits)
        .map(|visit| {
            let epoch = Epoch::from_gregorian_tai_at_midnight(2020 + visit as i32, 3, 1);
            let dt = starcal::star::epoch_delta_years(reference_epoch, epoch);
            let stars = reference
                .iter()
                .enumerate()
                .map(|(id, r)| {
                    let (ra, dec) = r.position_at(dt);
                    let noise = 0.1 / ARCSEC_PER_DEG;
                    MeasuredStar::new(
                        id as u64,
                        ra + rng.random_range(-noise..noise),
                        dec + rng.random_range(-noise..noise),
                        r.flux * rng.random_range(0.98..1.02),
                        r.flux_err,
                        epoch,
                    )
                })
                .collect();
            ProcessedExposure::new(ExposureKey::new(visit, 0), epoch, stars)
        })
        .collect()
}

fn bench_compute_rms(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let reference_epoch = Epoch::from_gregorian_tai_at_midnight(2016, 1, 1);
    let reference = reference(&mut rng, 100);
    let processed = exposures(&mut rng, &reference, reference_epoch, 4);
    let config = CalibrationConfig::default();

    c.bench_function("compute_rms/10k_stars_4_visits", |b| {
        b.iter(|| {
            compute_rms(
                black_box(&processed),
                black_box(&reference),
                reference_epoch,
                &config,
            )
        })
    });
}

criterion_group!(benches, bench_compute_rms);
criterion_main!(benches);
