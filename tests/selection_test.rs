mod common;

use rand::{rngs::StdRng, SeedableRng};
use starcal::{
    config::CalibrationConfig,
    selection::{SelectionMode, StarSelector, ZeroPointCalib},
};

use common::random_catalog;

fn standard_cuts(flux: f64, flux_err: f64, x_err: f64, y_err: f64, sn_cut: f64) -> bool {
    flux > 0.0 && flux / flux_err > sn_cut && x_err.is_finite() && y_err.is_finite()
}

#[test]
fn selection_keeps_exactly_the_passing_sources() {
    let mut rng = StdRng::seed_from_u64(2024);
    let catalog = random_catalog(&mut rng, 5000);
    let schema = catalog.schema();
    let flux = schema.f64_key("base_CircularApertureFlux_17_0_flux").unwrap();
    let flux_err = schema.f64_key("base_CircularApertureFlux_17_0_fluxErr").unwrap();
    let x_err = schema.f64_key("base_SdssCentroid_xErr").unwrap();
    let y_err = schema.f64_key("base_SdssCentroid_yErr").unwrap();

    for sn_cut in [0.0, 5.0, 20.0, 100.0] {
        let config = CalibrationConfig::builder().sn_cut(sn_cut).build().unwrap();
        let selected = StarSelector::new(&config).select(&catalog, None).unwrap();

        let expected: Vec<u64> = catalog
            .iter()
            .filter(|r| {
                standard_cuts(
                    r.get(flux),
                    r.get(flux_err),
                    r.get(x_err),
                    r.get(y_err),
                    sn_cut,
                )
            })
            .map(|r| r.id)
            .collect();
        let ids: Vec<u64> = selected.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected, "sn_cut = {sn_cut}");
        assert!(!ids.is_empty());
    }
}

#[test]
fn selection_is_idempotent_in_every_mode() {
    let mut rng = StdRng::seed_from_u64(99);
    let catalog = random_catalog(&mut rng, 2000);
    let calib = ZeroPointCalib::new(27.0);

    for (mode, reject_flagged) in [
        (SelectionMode::Standard, false),
        (SelectionMode::Standard, true),
        (SelectionMode::Strict, false),
        (SelectionMode::Strict, true),
    ] {
        let config = CalibrationConfig::builder()
            .selection_mode(mode)
            .reject_flagged(reject_flagged)
            .build()
            .unwrap();
        let selector = StarSelector::new(&config);
        let once = selector.select(&catalog, Some(&calib)).unwrap();
        let twice = selector.select(&once, Some(&calib)).unwrap();
        assert_eq!(once, twice);
        assert_eq!(catalog.len(), 2000);
    }
}

#[test]
fn stricter_settings_select_subsets() {
    let mut rng = StdRng::seed_from_u64(5);
    let catalog = random_catalog(&mut rng, 3000);
    let calib = ZeroPointCalib::new(27.0);

    let standard = CalibrationConfig::default();
    let flagged = CalibrationConfig::builder().reject_flagged(true).build().unwrap();
    let strict = CalibrationConfig::builder()
        .selection_mode(SelectionMode::Strict)
        .build()
        .unwrap();

    let ids = |config: &CalibrationConfig| -> Vec<u64> {
        StarSelector::new(config)
            .select(&catalog, Some(&calib))
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect()
    };
    let base = ids(&standard);
    let without_flags = ids(&flagged);
    let strict_ids = ids(&strict);

    assert!(without_flags.len() < base.len());
    assert!(without_flags.iter().all(|id| base.contains(id)));
    assert!(strict_ids.len() < base.len());
    assert!(strict_ids.iter().all(|id| base.contains(id)));
}
