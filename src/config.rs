//! # Calibration configuration
//!
//! This module defines [`CalibrationConfig`], the single flat configuration object of a
//! matching run. It enumerates every option used by the star selection, the catalog
//! accumulation, the statistics engine and the (external) astrometric solver, and is
//! validated once, when it is built.
//!
//! ## Usage
//!
//! ```rust
//! use starcal::config::CalibrationConfig;
//!
//! let config = CalibrationConfig::builder()
//!     .sn_cut(10.0)
//!     .match_radius_arcsec(0.5)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.sn_cut, 10.0);
//! ```
//!
//! The configuration is `serde` (de)serializable so that the orchestration layer can
//! load it from any format; missing fields take their default value. A deserialized
//! configuration should be passed through [`CalibrationConfig::validate`].
use std::cmp::Ordering::{Equal, Greater};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        ArcSec, Magnitude, DEFAULT_FLUX_LIMIT, DEFAULT_MAX_MAG, DEFAULT_MAX_MAG_ERR,
        DEFAULT_SN_CUT,
    },
    selection::SelectionMode,
    starcal_errors::StarcalError,
};

/// Flags rejected by the selection when `reject_flagged` is enabled.
pub const DEFAULT_BAD_FLAGS: [&str; 5] = [
    "base_PixelFlags_flag_saturated",
    "base_PixelFlags_flag_cr",
    "base_PixelFlags_flag_interpolated",
    "base_SdssCentroid_flag",
    "base_SdssShape_flag",
];

/// Configuration of a matching run.
///
/// Fields
/// -----------------
/// * `source_flux_field` – prefix of the flux columns used for selection and photometry.
/// * `centroid_field` – prefix of the centroid columns.
/// * `shape_field` – prefix of the second-moment columns.
/// * `sn_cut` – minimum `flux / fluxErr` (strict inequality).
/// * `max_mag` – faint magnitude limit of the strict selection (needs a calibration).
/// * `max_mag_err` – magnitude error limit of the strict selection (needs a calibration).
/// * `selection_mode` – [`SelectionMode::Standard`] or [`SelectionMode::Strict`].
/// * `reject_flagged` – reject sources with any of `bad_flags` or the flux flag set.
/// * `bad_flags` – flag columns considered when `reject_flagged` is on.
/// * `poly_order` – polynomial order of the distortion fit, for the solver.
/// * `match_radius_arcsec` – cross-match radius of the statistics.
/// * `flux_limit` – minimum `flux / fluxErr` of detections used for PA1.
/// * `max_mag_scatter` – stars with a larger magnitude scatter are clipped from PA1.
/// * `bright_fraction` – fraction of the brightest repeat stars used for PA1.
///
/// Defaults
/// -----------------
/// * `source_flux_field`: `base_CircularApertureFlux_17_0`
/// * `centroid_field`: `base_SdssCentroid`
/// * `shape_field`: `base_SdssShape`
/// * `sn_cut`: 20
/// * `max_mag`: 22.5, `max_mag_err`: 0.1
/// * `selection_mode`: `Standard`, `reject_flagged`: false
/// * `bad_flags`: [`DEFAULT_BAD_FLAGS`]
/// * `poly_order`: 3
/// * `match_radius_arcsec`: 1.0
/// * `flux_limit`: 100, `max_mag_scatter`: 0.5, `bright_fraction`: 0.5
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    // --- Selection ---
    pub source_flux_field: String,
    pub centroid_field: String,
    pub shape_field: String,
    pub sn_cut: f64,
    pub max_mag: Magnitude,
    pub max_mag_err: Magnitude,
    pub selection_mode: SelectionMode,
    pub reject_flagged: bool,
    pub bad_flags: Vec<String>,

    // --- Solver ---
    pub poly_order: u32,

    // --- Statistics ---
    pub match_radius_arcsec: ArcSec,
    pub flux_limit: f64,
    pub max_mag_scatter: Magnitude,
    pub bright_fraction: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            source_flux_field: "base_CircularApertureFlux_17_0".into(),
            centroid_field: "base_SdssCentroid".into(),
            shape_field: "base_SdssShape".into(),
            sn_cut: DEFAULT_SN_CUT,
            max_mag: DEFAULT_MAX_MAG,
            max_mag_err: DEFAULT_MAX_MAG_ERR,
            selection_mode: SelectionMode::Standard,
            reject_flagged: false,
            bad_flags: DEFAULT_BAD_FLAGS.iter().map(|s| s.to_string()).collect(),
            poly_order: 3,
            match_radius_arcsec: 1.0,
            flux_limit: DEFAULT_FLUX_LIMIT,
            max_mag_scatter: 0.5,
            bright_fraction: 0.5,
        }
    }
}

impl CalibrationConfig {
    /// Construct a configuration with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`CalibrationConfigBuilder`] starting from the defaults.
    pub fn builder() -> CalibrationConfigBuilder {
        CalibrationConfigBuilder::new()
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Check the consistency of every option.
    ///
    /// Validation rules
    /// -----------------
    /// * field names are not empty;
    /// * `sn_cut >= 0`, `flux_limit >= 0`;
    /// * `max_mag` is finite, `max_mag_err > 0`;
    /// * `poly_order >= 1`;
    /// * `match_radius_arcsec > 0` and finite, `max_mag_scatter > 0`;
    /// * `0 < bright_fraction <= 1`.
    ///
    /// Returns
    /// -----------------
    /// * `Err(StarcalError::InvalidConfiguration)` naming the first failing rule.
    pub fn validate(&self) -> Result<(), StarcalError> {
        let invalid = |msg: &str| Err(StarcalError::InvalidConfiguration(msg.into()));

        if self.source_flux_field.is_empty()
            || self.centroid_field.is_empty()
            || self.shape_field.is_empty()
        {
            return invalid("field names must not be empty");
        }
        if self.bad_flags.iter().any(String::is_empty) {
            return invalid("bad flag names must not be empty");
        }
        if !Self::ge0(self.sn_cut) {
            return invalid("sn_cut must be non-negative");
        }
        if !self.max_mag.is_finite() {
            return invalid("max_mag must be finite");
        }
        if !Self::gt0(self.max_mag_err) {
            return invalid("max_mag_err must be > 0");
        }
        if self.poly_order == 0 {
            return invalid("poly_order must be >= 1");
        }
        if !Self::gt0(self.match_radius_arcsec) || !self.match_radius_arcsec.is_finite() {
            return invalid("match_radius_arcsec must be a finite value > 0");
        }
        if !Self::ge0(self.flux_limit) {
            return invalid("flux_limit must be non-negative");
        }
        if !Self::gt0(self.max_mag_scatter) {
            return invalid("max_mag_scatter must be > 0");
        }
        if !Self::gt0(self.bright_fraction) || self.bright_fraction > 1.0 {
            return invalid("bright_fraction must be in (0, 1]");
        }
        Ok(())
    }
}

/// Builder for [`CalibrationConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct CalibrationConfigBuilder {
    config: CalibrationConfig,
}

impl CalibrationConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            config: CalibrationConfig::default(),
        }
    }

    pub fn source_flux_field(mut self, v: impl Into<String>) -> Self {
        self.config.source_flux_field = v.into();
        self
    }
    pub fn centroid_field(mut self, v: impl Into<String>) -> Self {
        self.config.centroid_field = v.into();
        self
    }
    pub fn shape_field(mut self, v: impl Into<String>) -> Self {
        self.config.shape_field = v.into();
        self
    }
    pub fn sn_cut(mut self, v: f64) -> Self {
        self.config.sn_cut = v;
        self
    }
    pub fn max_mag(mut self, v: Magnitude) -> Self {
        self.config.max_mag = v;
        self
    }
    pub fn max_mag_err(mut self, v: Magnitude) -> Self {
        self.config.max_mag_err = v;
        self
    }
    pub fn selection_mode(mut self, v: SelectionMode) -> Self {
        self.config.selection_mode = v;
        self
    }
    pub fn reject_flagged(mut self, v: bool) -> Self {
        self.config.reject_flagged = v;
        self
    }
    pub fn bad_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.bad_flags = flags.into_iter().map(Into::into).collect();
        self
    }
    pub fn poly_order(mut self, v: u32) -> Self {
        self.config.poly_order = v;
        self
    }
    pub fn match_radius_arcsec(mut self, v: ArcSec) -> Self {
        self.config.match_radius_arcsec = v;
        self
    }
    pub fn flux_limit(mut self, v: f64) -> Self {
        self.config.flux_limit = v;
        self
    }
    pub fn max_mag_scatter(mut self, v: Magnitude) -> Self {
        self.config.max_mag_scatter = v;
        self
    }
    pub fn bright_fraction(mut self, v: f64) -> Self {
        self.config.bright_fraction = v;
        self
    }

    /// Validate and produce the [`CalibrationConfig`], see [`CalibrationConfig::validate`].
    pub fn build(self) -> Result<CalibrationConfig, StarcalError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl fmt::Display for CalibrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Calibration configuration")?;
            writeln!(f, "-------------------------")?;
            writeln!(f, "source_flux_field   : {}", self.source_flux_field)?;
            writeln!(f, "centroid_field      : {}", self.centroid_field)?;
            writeln!(f, "shape_field         : {}", self.shape_field)?;
            writeln!(f, "sn_cut              : {}", self.sn_cut)?;
            writeln!(f, "max_mag             : {}", self.max_mag)?;
            writeln!(f, "max_mag_err         : {}", self.max_mag_err)?;
            writeln!(f, "selection_mode      : {:?}", self.selection_mode)?;
            writeln!(f, "reject_flagged      : {}", self.reject_flagged)?;
            writeln!(f, "bad_flags           : [{}]", self.bad_flags.join(", "))?;
            writeln!(f, "poly_order          : {}", self.poly_order)?;
            writeln!(f, "match_radius_arcsec : {}", self.match_radius_arcsec)?;
            writeln!(f, "flux_limit          : {}", self.flux_limit)?;
            writeln!(f, "max_mag_scatter     : {}", self.max_mag_scatter)?;
            write!(f, "bright_fraction     : {}", self.bright_fraction)
        } else {
            write!(
                f,
                "flux={}, centroid={}, shape={}, sn_cut={}, mode={:?}, reject_flagged={}, radius={}\"",
                self.source_flux_field,
                self.centroid_field,
                self.shape_field,
                self.sn_cut,
                self.selection_mode,
                self.reject_flagged,
                self.match_radius_arcsec
            )
        }
    }
}
