//! # Star model
//!
//! Value types shared by the selection, the accumulation and the statistics:
//!
//! * [`RefStar`] – a reference catalog entry, optionally carrying a [`ProperMotion`],
//! * [`MeasuredStar`] – a detection accepted by the selection, measured on one exposure,
//! * [`ProperMotion`] – proper motion in rad/yr (`μα·cos δ`, `μδ`) with its errors.
//!
//! Reference positions are moved to a measurement epoch with
//! [`RefStar::apply_proper_motion`]; time spans are Julian years, see
//! [`epoch_delta_years`].
pub mod measured_star;
pub mod proper_motion;
pub mod ref_star;

use hifitime::Epoch;

pub use measured_star::MeasuredStar;
pub use proper_motion::ProperMotion;
pub use ref_star::RefStar;

use crate::constants::{Years, JULIAN_YEAR_DAYS};

/// Time elapsed from `from` to `to`, in Julian years (365.25 days).
///
/// The difference is computed by `hifitime` on the TAI time line, so leap seconds
/// between the two epochs are accounted for.
pub fn epoch_delta_years(from: Epoch, to: Epoch) -> Years {
    (to - from).to_seconds() / (JULIAN_YEAR_DAYS * 86_400.0)
}

#[cfg(test)]
mod star_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_epoch_delta_years() {
        let e1 = Epoch::from_gregorian_tai_hms(2000, 1, 1, 0, 0, 5);
        let e2 = Epoch::from_gregorian_tai_hms(2010, 1, 1, 0, 0, 5);
        assert_relative_eq!(
            epoch_delta_years(e1, e2),
            3653.0 / 365.25,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            epoch_delta_years(e2, e1),
            -3653.0 / 365.25,
            epsilon = 1e-12
        );
        assert_eq!(epoch_delta_years(e1, e1), 0.0);
    }
}
