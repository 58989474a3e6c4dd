use crate::constants::{Magnitude, POGSON};

/// Photometric calibration turning instrumental fluxes into magnitudes.
///
/// Only the strict selection consults a calibration; without one the magnitude
/// cuts are skipped entirely.
pub trait PhotoCalib {
    /// Magnitude and magnitude error of a flux measurement.
    ///
    /// Non-positive fluxes must produce a non-finite magnitude rather than panic.
    fn magnitude(&self, flux: f64, flux_err: f64) -> (Magnitude, Magnitude);
}

/// Calibration by a single photometric zero point: `mag = zp - 2.5 log10(flux)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroPointCalib {
    pub zero_point: Magnitude,
}

impl ZeroPointCalib {
    pub fn new(zero_point: Magnitude) -> Self {
        ZeroPointCalib { zero_point }
    }
}

impl PhotoCalib for ZeroPointCalib {
    fn magnitude(&self, flux: f64, flux_err: f64) -> (Magnitude, Magnitude) {
        if flux <= 0.0 {
            return (f64::NAN, f64::NAN);
        }
        (
            self.zero_point - 2.5 * flux.log10(),
            POGSON * flux_err.abs() / flux,
        )
    }
}
