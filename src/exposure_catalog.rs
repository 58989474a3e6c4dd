//! # Exposure catalog accumulation
//!
//! The [`ExposureCatalog`] gathers the cleaned [`MeasuredStar`]s of every exposure/chip of
//! a matching run, keyed by [`ExposureKey`], together with the single [`TangentPoint`]
//! shared by all exposures. It is the input handed to the astrometric solver.
//!
//! ## Tangent point policy
//!
//! The tangent point is set once, either at construction or by the first call to
//! [`ExposureCatalog::set_tangent_point`], and is frozen afterwards:
//!
//! * setting the same value again is a no-op,
//! * setting a different value fails with [`StarcalError::TangentPointConflict`]; this
//!   always reveals a configuration or exposure-ordering bug, so the run should stop.
//!
//! ## Accumulation
//!
//! [`ExposureCatalog::add_exposure`] appends stars under a key without deduplication:
//! associating detections of the same star across exposures is the solver's job.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{ChipId, Degree, VisitId},
    sky::{gnomonic_project, normalize_ra},
    star::MeasuredStar,
    starcal_errors::StarcalError,
    wcs::SkyMapping,
};

/// Identifier of one chip of one exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExposureKey {
    pub visit: VisitId,
    pub chip: ChipId,
}

impl ExposureKey {
    pub fn new(visit: VisitId, chip: ChipId) -> Self {
        ExposureKey { visit, chip }
    }
}

impl fmt::Display for ExposureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.visit, self.chip)
    }
}

/// Common origin of the tangent-plane projection of a matching run, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TangentPoint {
    pub ra: Degree,
    pub dec: Degree,
}

impl TangentPoint {
    /// Validated constructor, `ra` is wrapped into `[0, 360)`.
    pub fn new(ra: Degree, dec: Degree) -> Result<Self, StarcalError> {
        if !ra.is_finite() || !(-90.0..=90.0).contains(&dec) {
            return Err(StarcalError::InvalidCoordinates(format!(
                "tangent point ra={ra}, dec={dec}"
            )));
        }
        Ok(TangentPoint {
            ra: normalize_ra(ra),
            dec,
        })
    }
}

impl fmt::Display for TangentPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(ra={:.6}, dec={:.6})", self.ra, self.dec)
    }
}

/// The stars accumulated for one exposure/chip.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipCatalog {
    pub stars: Vec<MeasuredStar>,
    /// Flux field the stars were measured with.
    pub flux_field: String,
}

/// Matching-ready catalog of a full run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposureCatalog {
    tangent_point: Option<TangentPoint>,
    chips: BTreeMap<ExposureKey, ChipCatalog>,
}

impl ExposureCatalog {
    /// Empty catalog, tangent point unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty catalog with a frozen tangent point.
    pub fn with_tangent_point(tangent_point: TangentPoint) -> Self {
        ExposureCatalog {
            tangent_point: Some(tangent_point),
            chips: BTreeMap::new(),
        }
    }

    pub fn tangent_point(&self) -> Option<TangentPoint> {
        self.tangent_point
    }

    /// Set the tangent point, see the module documentation for the freeze policy.
    ///
    /// Return
    /// ------
    /// * `Ok(true)` if the tangent point was set by this call, `Ok(false)` if the same
    ///   value was already set.
    pub fn set_tangent_point(&mut self, tangent_point: TangentPoint) -> Result<bool, StarcalError> {
        match self.tangent_point {
            None => {
                self.tangent_point = Some(tangent_point);
                Ok(true)
            }
            Some(current) if current == tangent_point => Ok(false),
            Some(current) => Err(StarcalError::TangentPointConflict {
                current,
                requested: tangent_point,
            }),
        }
    }

    /// Append the cleaned stars of one exposure/chip.
    ///
    /// Arguments
    /// ---------
    /// * `stars`: the selected stars, tagged with the key on insertion
    /// * `visit`, `chip`: identifiers of the exposure/chip
    /// * `flux_field`: name of the flux field the stars were measured with
    ///
    /// Return
    /// ------
    /// * the number of stars now held under this key
    pub fn add_exposure(
        &mut self,
        stars: Vec<MeasuredStar>,
        visit: VisitId,
        chip: ChipId,
        flux_field: &str,
    ) -> usize {
        let key = ExposureKey::new(visit, chip);
        let entry = self.chips.entry(key).or_insert_with(|| ChipCatalog {
            stars: Vec::new(),
            flux_field: flux_field.to_string(),
        });
        entry.stars.extend(stars.into_iter().map(|mut star| {
            star.tag_exposure(key);
            star
        }));
        entry.stars.len()
    }

    pub fn exposure_count(&self) -> usize {
        self.chips.len()
    }

    /// Number of stars accumulated over all exposures.
    pub fn total_star_count(&self) -> usize {
        self.chips.values().map(|c| c.stars.len()).sum()
    }

    /// Number of stars accumulated for one exposure/chip, 0 for an unknown key.
    pub fn star_count(&self, key: &ExposureKey) -> usize {
        self.chips.get(key).map_or(0, |c| c.stars.len())
    }

    pub fn chip(&self, key: &ExposureKey) -> Option<&ChipCatalog> {
        self.chips.get(key)
    }

    /// Keys in ascending (visit, chip) order.
    pub fn keys(&self) -> impl Iterator<Item = &ExposureKey> {
        self.chips.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExposureKey, &ChipCatalog)> {
        self.chips.iter()
    }

    /// Gnomonic projection of the stars of one chip about the tangent point.
    ///
    /// The accumulated stars carry pixel centroids; they are placed on the sky with the
    /// fitted `mapping` of the chip before projection. Stars on the far hemisphere yield
    /// `None`.
    ///
    /// Errors
    /// ------
    /// * [`StarcalError::MissingTangentPoint`] if the tangent point is not set yet.
    /// * [`StarcalError::MissingMapping`] if the key is unknown.
    pub fn tangent_plane_positions<M: SkyMapping + ?Sized>(
        &self,
        key: &ExposureKey,
        mapping: &M,
    ) -> Result<Vec<Option<(Degree, Degree)>>, StarcalError> {
        let tangent_point = self
            .tangent_point
            .ok_or(StarcalError::MissingTangentPoint)?;
        let chip = self
            .chips
            .get(key)
            .ok_or(StarcalError::MissingMapping(*key))?;
        Ok(chip
            .stars
            .iter()
            .map(|s| {
                let (ra, dec) = mapping.pixel_to_sky(s.x, s.y);
                gnomonic_project(&tangent_point, ra, dec)
            })
            .collect())
    }
}
