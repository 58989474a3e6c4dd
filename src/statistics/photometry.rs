//! Photometric repeatability (PA1).
use itertools::Itertools;

use crate::constants::{Magnitude, IQR_TO_SIGMA};

/// Repeat magnitudes of one star, restricted to the high S/N detections.
#[derive(Debug, Clone)]
pub(crate) struct RepeatMagnitudes {
    mean: Magnitude,
    /// Residuals from the mean, scaled by `sqrt(n / (n - 1))`.
    residuals: Vec<Magnitude>,
}

impl RepeatMagnitudes {
    /// `None` when fewer than two magnitudes are available.
    pub(crate) fn new(mags: &[Magnitude]) -> Option<Self> {
        let n = mags.len();
        if n < 2 {
            return None;
        }
        let mean = mags.iter().sum::<f64>() / n as f64;
        let scale = (n as f64 / (n as f64 - 1.0)).sqrt();
        Some(RepeatMagnitudes {
            mean,
            residuals: mags.iter().map(|m| (m - mean) * scale).collect(),
        })
    }

    /// RMS of the scaled residuals.
    pub(crate) fn scatter(&self) -> Magnitude {
        (self.residuals.iter().map(|r| r * r).sum::<f64>() / self.residuals.len() as f64).sqrt()
    }
}

/// Linear interpolation quantile of sorted data, `q` in `[0, 1]`.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        n => {
            let h = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
        }
    }
}

/// Robust standard deviation, `0.7413 × IQR`.
pub(crate) fn robust_sigma(values: &[f64]) -> Option<f64> {
    let sorted: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .sorted_by(|a, b| a.total_cmp(b))
        .collect();
    if sorted.len() < 2 {
        return None;
    }
    Some(IQR_TO_SIGMA * (quantile(&sorted, 0.75)? - quantile(&sorted, 0.25)?))
}

/// PA1 over a set of repeat-observed stars.
///
/// Arguments
/// ---------
/// * `stars`: per-star repeat magnitudes
/// * `max_scatter`: stars with a larger scatter are dropped
/// * `bright_fraction`: fraction of the remaining stars kept, brightest first
///
/// Return
/// ------
/// * the PA1 value and the number of stars it was computed from, `None` when no star
///   survives the cuts.
pub(crate) fn pa1(
    stars: Vec<RepeatMagnitudes>,
    max_scatter: Magnitude,
    bright_fraction: f64,
) -> Option<(Magnitude, usize)> {
    let kept: Vec<RepeatMagnitudes> = stars
        .into_iter()
        .filter(|s| s.scatter() <= max_scatter)
        .sorted_by(|a, b| a.mean.total_cmp(&b.mean))
        .collect();
    if kept.is_empty() {
        return None;
    }
    let n_bright = ((kept.len() as f64 * bright_fraction).ceil() as usize).clamp(1, kept.len());
    let pooled: Vec<f64> = kept[..n_bright]
        .iter()
        .flat_map(|s| s.residuals.iter().copied())
        .collect();
    robust_sigma(&pooled).map(|sigma| (sigma, n_bright))
}

#[cfg(test)]
mod photometry_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_quantile() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&data, 0.5), Some(3.0));
        assert_eq!(quantile(&data, 0.25), Some(2.0));
        assert_eq!(quantile(&[1.0, 2.0], 0.75), Some(1.75));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_repeat_magnitudes() {
        assert!(RepeatMagnitudes::new(&[20.0]).is_none());
        let star = RepeatMagnitudes::new(&[20.0, 20.2]).unwrap();
        assert_abs_diff_eq!(star.mean, 20.1, epsilon = 1e-12);
        // +-0.1 scaled by sqrt(2)
        assert_abs_diff_eq!(star.scatter(), 0.1 * 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_pa1_clipping_and_bright_fraction() {
        let stars = vec![
            RepeatMagnitudes::new(&[18.0, 18.02]).unwrap(),
            RepeatMagnitudes::new(&[19.0, 19.02]).unwrap(),
            // clipped outlier
            RepeatMagnitudes::new(&[17.0, 19.0]).unwrap(),
            // faint half, dropped
            RepeatMagnitudes::new(&[22.0, 22.4]).unwrap(),
            RepeatMagnitudes::new(&[23.0, 23.4]).unwrap(),
        ];
        let (value, n) = pa1(stars, 0.5, 0.5).unwrap();
        // 4 survivors, the 2 brightest kept
        assert_eq!(n, 2);
        // residuals are +-0.01 sqrt(2), twice each: IQR = 0.02 sqrt(2)
        assert_abs_diff_eq!(value, IQR_TO_SIGMA * 0.02 * 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_pa1_undefined() {
        assert!(pa1(Vec::new(), 0.5, 0.5).is_none());
        let noisy = vec![RepeatMagnitudes::new(&[17.0, 19.0]).unwrap()];
        assert!(pa1(noisy, 0.5, 0.5).is_none());
    }
}
