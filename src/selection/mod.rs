//! # Star selection
//!
//! Reduce a raw detection catalog to the sources usable for astrometric matching.
//!
//! ## Standard cuts
//!
//! A source is kept iff **all** of the following hold:
//!
//! * `flux > 0`,
//! * `flux / fluxErr > sn_cut`,
//! * the centroid errors `xErr` and `yErr` are finite,
//! * (only with `reject_flagged`) none of the bad flags nor the flux flag is set.
//!
//! ## Strict cuts
//!
//! With [`SelectionMode::Strict`], a source passing the standard cuts is further rejected
//! when any of the following holds, with `vx = xErr²`, `vy = yErr²` and
//! `vxy = mxy (vx + vy) / (mxx + myy)` built from the second moments of the shape:
//!
//! * `vx < 0`, `vy < 0`, `vx` or `vy` is NaN,
//! * `vxy² > vx·vy` (non positive-definite covariance),
//! * the footprint has more than one peak (blend),
//! * with a [`PhotoCalib`] only: `mag > max_mag` or `mag_err > max_mag_err`.
//!
//! Selections preserve the input order and never modify the input catalog. An empty
//! result is a valid outcome.
pub mod photo_calib;

use hifitime::Epoch;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use photo_calib::{PhotoCalib, ZeroPointCalib};

use crate::{
    catalog::{F64Key, FlagKey, Schema, SourceCatalog, SourceRecord},
    config::CalibrationConfig,
    star::MeasuredStar,
    starcal_errors::StarcalError,
};

/// Which family of cuts the selection applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Flux, S/N and finite centroid errors.
    #[default]
    Standard,
    /// Standard cuts plus covariance, blend and magnitude cuts.
    Strict,
}

/// Counts of one selection, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionStats {
    pub n_input: usize,
    pub n_selected: usize,
}

impl SelectionStats {
    pub fn n_rejected(&self) -> usize {
        self.n_input - self.n_selected
    }
}

/// Column keys of one catalog schema, resolved once before iterating the records.
#[derive(Debug, Clone)]
struct ResolvedFields {
    flux: F64Key,
    flux_err: F64Key,
    x: F64Key,
    y: F64Key,
    x_err: F64Key,
    y_err: F64Key,
    mxx: F64Key,
    myy: F64Key,
    mxy: F64Key,
    bad_flags: Vec<FlagKey>,
}

impl ResolvedFields {
    fn resolve(schema: &Schema, config: &CalibrationConfig) -> Result<Self, StarcalError> {
        let flux = &config.source_flux_field;
        let centroid = &config.centroid_field;
        let shape = &config.shape_field;

        let bad_flags = if config.reject_flagged {
            config
                .bad_flags
                .iter()
                .map(|name| schema.flag_key(name))
                .chain(std::iter::once(schema.flag_key(&format!("{flux}_flag"))))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        Ok(ResolvedFields {
            flux: schema.f64_key(&format!("{flux}_flux"))?,
            flux_err: schema.f64_key(&format!("{flux}_fluxErr"))?,
            x: schema.f64_key(&format!("{centroid}_x"))?,
            y: schema.f64_key(&format!("{centroid}_y"))?,
            x_err: schema.f64_key(&format!("{centroid}_xErr"))?,
            y_err: schema.f64_key(&format!("{centroid}_yErr"))?,
            mxx: schema.f64_key(&format!("{shape}_xx"))?,
            myy: schema.f64_key(&format!("{shape}_yy"))?,
            mxy: schema.f64_key(&format!("{shape}_xy"))?,
            bad_flags,
        })
    }

    /// Position variances and covariance of a record.
    fn variances(&self, record: &SourceRecord) -> (f64, f64, f64) {
        let x_err = record.get(self.x_err);
        let y_err = record.get(self.y_err);
        let vx = x_err * x_err;
        let vy = y_err * y_err;
        let vxy = record.get(self.mxy) * (vx + vy) / (record.get(self.mxx) + record.get(self.myy));
        (vx, vy, vxy)
    }
}

/// Applies the configured cuts to detection catalogs.
#[derive(Debug, Clone)]
pub struct StarSelector<'a> {
    config: &'a CalibrationConfig,
}

impl<'a> StarSelector<'a> {
    pub fn new(config: &'a CalibrationConfig) -> Self {
        StarSelector { config }
    }

    pub fn mode(&self) -> SelectionMode {
        self.config.selection_mode
    }

    fn passes_standard(&self, fields: &ResolvedFields, record: &SourceRecord) -> bool {
        if fields.bad_flags.iter().any(|&key| record.flag(key)) {
            return false;
        }
        let flux = record.get(fields.flux);
        let flux_err = record.get(fields.flux_err);
        flux > 0.0
            && flux / flux_err > self.config.sn_cut
            && record.get(fields.x_err).is_finite()
            && record.get(fields.y_err).is_finite()
    }

    fn passes_strict(
        &self,
        fields: &ResolvedFields,
        record: &SourceRecord,
        calib: Option<&dyn PhotoCalib>,
    ) -> bool {
        if let Some(calib) = calib {
            let (mag, mag_err) = calib.magnitude(record.get(fields.flux), record.get(fields.flux_err));
            if mag > self.config.max_mag || mag_err > self.config.max_mag_err {
                return false;
            }
        }
        if record.n_peaks > 1 {
            return false;
        }
        let (vx, vy, vxy) = fields.variances(record);
        !(vx.is_nan() || vy.is_nan() || vx < 0.0 || vy < 0.0 || vxy * vxy > vx * vy)
    }

    fn keep(
        &self,
        fields: &ResolvedFields,
        record: &SourceRecord,
        calib: Option<&dyn PhotoCalib>,
    ) -> bool {
        self.passes_standard(fields, record)
            && match self.config.selection_mode {
                SelectionMode::Standard => true,
                SelectionMode::Strict => self.passes_strict(fields, record, calib),
            }
    }

    /// Select the usable sources of a catalog.
    ///
    /// Arguments
    /// ---------
    /// * `catalog`: the raw detections of one exposure/chip
    /// * `calib`: photometric calibration, only used by the strict magnitude cuts
    ///
    /// Return
    /// ------
    /// * a new catalog with the kept records, in input order
    ///
    /// Errors
    /// ------
    /// * [`StarcalError::UnknownField`] / [`StarcalError::FieldTypeMismatch`] if a
    ///   configured column is missing from the catalog schema, before any record is read.
    pub fn select(
        &self,
        catalog: &SourceCatalog,
        calib: Option<&dyn PhotoCalib>,
    ) -> Result<SourceCatalog, StarcalError> {
        let fields = ResolvedFields::resolve(catalog.schema(), self.config)?;
        Ok(catalog.filtered(|record| self.keep(&fields, record, calib)))
    }

    /// Same as [`StarSelector::select`], with the selection counts.
    pub fn select_with_stats(
        &self,
        catalog: &SourceCatalog,
        calib: Option<&dyn PhotoCalib>,
    ) -> Result<(SourceCatalog, SelectionStats), StarcalError> {
        let selected = self.select(catalog, calib)?;
        let stats = SelectionStats {
            n_input: catalog.len(),
            n_selected: selected.len(),
        };
        debug!(
            "selection ({:?}): kept {} of {} sources",
            self.config.selection_mode, stats.n_selected, stats.n_input
        );
        Ok((selected, stats))
    }

    /// Turn the records of a (selected) catalog into [`MeasuredStar`]s.
    ///
    /// Positions are the centroid in pixels, `vx = xErr²`, `vy = yErr²`, and `vxy` is
    /// scaled from the shape moments (0 when the moments are degenerate). The magnitude is
    /// filled from `calib` when given.
    pub fn measured_stars(
        &self,
        catalog: &SourceCatalog,
        epoch: Epoch,
        calib: Option<&dyn PhotoCalib>,
    ) -> Result<Vec<MeasuredStar>, StarcalError> {
        let fields = ResolvedFields::resolve(catalog.schema(), self.config)?;
        Ok(catalog
            .iter()
            .map(|record| {
                let flux = record.get(fields.flux);
                let flux_err = record.get(fields.flux_err);
                let (vx, vy, vxy) = fields.variances(record);
                let mut star = MeasuredStar::new(
                    record.id,
                    record.get(fields.x),
                    record.get(fields.y),
                    flux,
                    flux_err,
                    epoch,
                )
                .with_variances(vx, vy, if vxy.is_finite() { vxy } else { 0.0 });
                star.mag = calib.map(|c| c.magnitude(flux, flux_err).0);
                star
            })
            .collect())
    }
}
