//! # Matching run
//!
//! Driver of one astrometric matching run over an ordered list of exposures:
//!
//! 1. the tangent point is taken from the first exposure whose header provides one, and
//!    frozen for the whole run,
//! 2. each exposure/chip catalog goes through the [`StarSelector`]; an empty selection is
//!    logged and the exposure skipped,
//! 3. the selected stars are accumulated in the [`ExposureCatalog`],
//! 4. the catalog is handed to an [`AstrometrySolver`] ([`run_matching`]).
//!
//! Processing is sequential, in the order given by the caller.
use std::collections::BTreeMap;
use std::fmt;

use hifitime::Epoch;
use tracing::{info, warn};

use crate::{
    catalog::SourceCatalog,
    config::CalibrationConfig,
    constants::{ChipId, Degree, VisitId},
    conversion::{parse_dec_to_deg, parse_ra_to_deg},
    exposure_catalog::{ExposureCatalog, ExposureKey, TangentPoint},
    selection::{PhotoCalib, SelectionStats, StarSelector},
    statistics::ProcessedExposure,
    starcal_errors::StarcalError,
    wcs::{AstrometrySolver, SkyMapping},
};

/// Pointing information of an exposure, candidate tangent point of the run.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExposureHeader {
    /// The exposure does not provide a pointing.
    #[default]
    Empty,
    /// Pointing in decimal degrees.
    Degrees { ra: Degree, dec: Degree },
    /// Raw `RA` (`HH:MM:SS.ss`) and `DEC` (`±DD:MM:SS.s`) header cards.
    Sexagesimal { ra: String, dec: String },
}

impl ExposureHeader {
    pub fn sexagesimal(ra: impl Into<String>, dec: impl Into<String>) -> Self {
        ExposureHeader::Sexagesimal {
            ra: ra.into(),
            dec: dec.into(),
        }
    }

    /// Tangent point described by this header, `None` for [`ExposureHeader::Empty`].
    ///
    /// Errors
    /// ------
    /// * [`StarcalError::InvalidCoordinates`] for unparsable or out of range values.
    pub fn tangent_point(&self) -> Result<Option<TangentPoint>, StarcalError> {
        match self {
            ExposureHeader::Empty => Ok(None),
            ExposureHeader::Degrees { ra, dec } => TangentPoint::new(*ra, *dec).map(Some),
            ExposureHeader::Sexagesimal { ra, dec } => {
                let invalid = || StarcalError::InvalidCoordinates(format!("RA={ra}, DEC={dec}"));
                let ra = parse_ra_to_deg(ra).ok_or_else(invalid)?;
                let dec = parse_dec_to_deg(dec).ok_or_else(invalid)?;
                TangentPoint::new(ra, dec).map(Some)
            }
        }
    }
}

/// One exposure/chip to process.
#[derive(Debug, Clone)]
pub struct ExposureInput {
    pub visit: VisitId,
    pub chip: ChipId,
    pub epoch: Epoch,
    pub catalog: SourceCatalog,
    pub header: ExposureHeader,
}

impl ExposureInput {
    pub fn key(&self) -> ExposureKey {
        ExposureKey::new(self.visit, self.chip)
    }
}

/// What happened to each exposure of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulationReport {
    /// Selection counts, in processing order.
    pub selections: Vec<(ExposureKey, SelectionStats)>,
    /// Exposures with an empty selection.
    pub skipped: Vec<ExposureKey>,
}

impl AccumulationReport {
    pub fn n_selected(&self) -> usize {
        self.selections.iter().map(|(_, s)| s.n_selected).sum()
    }

    pub fn n_input(&self) -> usize {
        self.selections.iter().map(|(_, s)| s.n_input).sum()
    }
}

impl fmt::Display for AccumulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            for (key, stats) in &self.selections {
                writeln!(
                    f,
                    "{:>12} : {:>7} / {:>7}",
                    key.to_string(),
                    stats.n_selected,
                    stats.n_input
                )?;
            }
        }
        write!(
            f,
            "{} sources selected out of {} in {} exposures ({} skipped)",
            self.n_selected(),
            self.n_input(),
            self.selections.len(),
            self.skipped.len()
        )
    }
}

/// Select and accumulate the stars of every exposure.
///
/// Arguments
/// ---------
/// * `inputs`: exposures, in processing order
/// * `config`: the run configuration, validated here
/// * `calib`: optional photometric calibration for the strict magnitude cuts and the
///   star magnitudes
///
/// Return
/// ------
/// * the accumulated catalog and the per-exposure report. The tangent point of the
///   catalog is unset if no header provided one.
///
/// Errors
/// ------
/// * [`StarcalError::InvalidConfiguration`] for an invalid configuration.
/// * [`StarcalError::InvalidCoordinates`] if the header supplying the tangent point is
///   unparsable.
/// * [`StarcalError::UnknownField`] / [`StarcalError::FieldTypeMismatch`] when a catalog
///   lacks a configured column.
pub fn accumulate_exposures(
    inputs: &[ExposureInput],
    config: &CalibrationConfig,
    calib: Option<&dyn PhotoCalib>,
) -> Result<(ExposureCatalog, AccumulationReport), StarcalError> {
    config.validate()?;
    let selector = StarSelector::new(config);
    let mut catalog = ExposureCatalog::new();
    let mut report = AccumulationReport::default();

    for input in inputs {
        let key = input.key();
        if catalog.tangent_point().is_none() {
            if let Some(tangent_point) = input.header.tangent_point()? {
                catalog.set_tangent_point(tangent_point)?;
                info!("Using {tangent_point} as tangent point (from exposure {key})");
            }
        }

        let (selected, stats) = selector.select_with_stats(&input.catalog, calib)?;
        report.selections.push((key, stats));
        if stats.n_selected == 0 {
            warn!(
                "No source selected in visit {} chip {} (out of {}), skipping",
                input.visit, input.chip, stats.n_input
            );
            report.skipped.push(key);
            continue;
        }

        let stars = selector.measured_stars(&selected, input.epoch, calib)?;
        catalog.add_exposure(stars, input.visit, input.chip, &config.source_flux_field);
        info!(
            "{} sources selected in visit {} chip {} (out of {})",
            stats.n_selected, input.visit, input.chip, stats.n_input
        );
    }

    Ok((catalog, report))
}

/// Hand the accumulated catalog to the solver.
///
/// Errors
/// ------
/// * [`StarcalError::MissingTangentPoint`] if no exposure provided a tangent point.
/// * [`StarcalError::MissingMapping`] if the solver did not return a mapping for every
///   accumulated exposure.
/// * any error of the solver itself.
pub fn run_matching<S: AstrometrySolver>(
    catalog: &ExposureCatalog,
    config: &CalibrationConfig,
    solver: &mut S,
) -> Result<BTreeMap<ExposureKey, S::Mapping>, StarcalError> {
    let tangent_point = catalog
        .tangent_point()
        .ok_or(StarcalError::MissingTangentPoint)?;
    info!(
        "Fitting {} exposures ({} stars) about {tangent_point}, polynomial order {}",
        catalog.exposure_count(),
        catalog.total_star_count(),
        config.poly_order
    );

    let mappings = solver.fit(catalog, config)?;
    if let Some(missing) = catalog.keys().find(|key| !mappings.contains_key(*key)) {
        return Err(StarcalError::MissingMapping(*missing));
    }
    Ok(mappings)
}

/// Place the accumulated stars on the sky with the fitted mappings.
///
/// The epoch of each exposure is the epoch of its stars.
pub fn processed_exposures<M: SkyMapping>(
    catalog: &ExposureCatalog,
    mappings: &BTreeMap<ExposureKey, M>,
) -> Result<Vec<ProcessedExposure>, StarcalError> {
    catalog
        .iter()
        .filter_map(|(key, chip)| chip.stars.first().map(|s| (key, chip, s.epoch)))
        .map(|(key, chip, epoch)| {
            let mapping = mappings
                .get(key)
                .ok_or(StarcalError::MissingMapping(*key))?;
            Ok(ProcessedExposure::from_mapping(*key, epoch, &chip.stars, mapping))
        })
        .collect()
}
