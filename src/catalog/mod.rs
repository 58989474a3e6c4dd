//! # Detection catalogs
//!
//! A [`SourceCatalog`] holds the raw point-source detections of one exposure/chip as
//! produced by the measurement pipeline: a shared [`Schema`] describing the columns,
//! and one [`SourceRecord`] per detection.
//!
//! Column naming follows the measurement pipeline conventions:
//!
//! ```text
//! {flux}_flux, {flux}_fluxErr, {flux}_flag
//! {centroid}_x, {centroid}_y, {centroid}_xErr, {centroid}_yErr
//! {shape}_xx, {shape}_yy, {shape}_xy
//! ```
//!
//! Uncertainty columns use the `Err` suffix. Schemas from older pipeline versions name
//! them `{flux}_fluxSigma`, `{centroid}_xSigma` and `{centroid}_ySigma`; such catalogs
//! must be renamed before selection, otherwise it fails with
//! [`StarcalError::UnknownField`].
//!
//! Records are immutable once pushed into a catalog; selections produce new catalogs
//! sharing the same schema.
pub mod schema;

use std::sync::Arc;

pub use schema::{F64Key, FlagKey, Schema};

use crate::starcal_errors::StarcalError;

/// One detection of a point source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: u64,
    values: Vec<f64>,
    flags: Vec<bool>,
    /// Number of peaks detected in the footprint of the source (more than one means a blend).
    pub n_peaks: u32,
}

impl SourceRecord {
    /// Create a new record, the values and flags must follow the column order of the
    /// schema of the catalog it is pushed into.
    pub fn new(id: u64, values: Vec<f64>, flags: Vec<bool>, n_peaks: u32) -> Self {
        SourceRecord {
            id,
            values,
            flags,
            n_peaks,
        }
    }

    /// Value of a floating-point column, `NaN` if the key does not belong to this record.
    #[inline]
    pub fn get(&self, key: F64Key) -> f64 {
        self.values.get(key.0).copied().unwrap_or(f64::NAN)
    }

    /// Value of a flag column, `false` if the key does not belong to this record.
    #[inline]
    pub fn flag(&self, key: FlagKey) -> bool {
        self.flags.get(key.0).copied().unwrap_or(false)
    }

    /// Set a floating-point value, used while building catalogs.
    pub fn set(&mut self, key: F64Key, value: f64) {
        if let Some(v) = self.values.get_mut(key.0) {
            *v = value;
        }
    }

    /// Set a flag value, used while building catalogs.
    pub fn set_flag(&mut self, key: FlagKey, value: bool) {
        if let Some(v) = self.flags.get_mut(key.0) {
            *v = value;
        }
    }
}

/// The detections of one exposure/chip.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCatalog {
    schema: Arc<Schema>,
    records: Vec<SourceRecord>,
}

impl SourceCatalog {
    pub fn new(schema: Arc<Schema>) -> Self {
        SourceCatalog {
            schema,
            records: Vec::new(),
        }
    }

    /// Build a catalog from already read records.
    ///
    /// Errors
    /// ------
    /// * [`StarcalError::RecordShapeMismatch`] if any record does not have one value per
    ///   schema column.
    pub fn from_records(
        schema: Arc<Schema>,
        records: Vec<SourceRecord>,
    ) -> Result<Self, StarcalError> {
        let mut catalog = SourceCatalog::new(schema);
        catalog.records.reserve(records.len());
        for record in records {
            catalog.push(record)?;
        }
        Ok(catalog)
    }

    /// Append a record after checking it against the schema.
    pub fn push(&mut self, record: SourceRecord) -> Result<(), StarcalError> {
        let expected = self.schema.f64_count() + self.schema.flag_count();
        let found = record.values.len() + record.flags.len();
        if record.values.len() != self.schema.f64_count()
            || record.flags.len() != self.schema.flag_count()
        {
            return Err(StarcalError::RecordShapeMismatch { expected, found });
        }
        self.records.push(record);
        Ok(())
    }

    /// Create an empty record matching the schema: all values `NaN`, all flags unset, one peak.
    pub fn empty_record(&self, id: u64) -> SourceRecord {
        SourceRecord::new(
            id,
            vec![f64::NAN; self.schema.f64_count()],
            vec![false; self.schema.flag_count()],
            1,
        )
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn shared_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceRecord> {
        self.records.iter()
    }

    /// New catalog with the records satisfying `keep`, in input order.
    pub fn filtered<F>(&self, mut keep: F) -> SourceCatalog
    where
        F: FnMut(&SourceRecord) -> bool,
    {
        SourceCatalog {
            schema: Arc::clone(&self.schema),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SourceCatalog {
    type Item = &'a SourceRecord;
    type IntoIter = std::slice::Iter<'a, SourceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Build the schema of a standard measurement catalog.
///
/// Arguments
/// ---------
/// * `flux_field`: prefix of the flux columns (`_flux`, `_fluxErr`, `_flag`)
/// * `centroid_field`: prefix of the centroid columns (`_x`, `_y`, `_xErr`, `_yErr`)
/// * `shape_field`: prefix of the second-moment columns (`_xx`, `_yy`, `_xy`)
/// * `flags`: additional pixel/algorithm flag columns
pub fn measurement_schema(
    flux_field: &str,
    centroid_field: &str,
    shape_field: &str,
    flags: &[&str],
) -> Result<Schema, StarcalError> {
    let mut schema = Schema::new();
    for suffix in ["x", "y", "xErr", "yErr"] {
        schema.add_f64(&format!("{centroid_field}_{suffix}"))?;
    }
    schema.add_f64(&format!("{flux_field}_flux"))?;
    schema.add_f64(&format!("{flux_field}_fluxErr"))?;
    schema.add_flag(&format!("{flux_field}_flag"))?;
    for suffix in ["xx", "yy", "xy"] {
        schema.add_f64(&format!("{shape_field}_{suffix}"))?;
    }
    for flag in flags {
        schema.add_flag(flag)?;
    }
    Ok(schema)
}

#[cfg(test)]
mod catalog_test {
    use super::*;

    fn schema() -> Arc<Schema> {
        Arc::new(measurement_schema("psf", "centroid", "shape", &["flag_cr"]).unwrap())
    }

    #[test]
    fn test_measurement_schema_layout() {
        let schema = schema();
        assert_eq!(schema.f64_count(), 9);
        assert_eq!(schema.flag_count(), 2);
        assert!(schema.contains("psf_fluxErr"));
        assert!(schema.contains("centroid_yErr"));
        assert!(schema.contains("shape_xy"));
        assert!(schema.flag_key("psf_flag").is_ok());
    }

    #[test]
    fn test_push_checks_shape() {
        let mut catalog = SourceCatalog::new(schema());
        let record = catalog.empty_record(1);
        assert!(catalog.push(record).is_ok());

        let bad = SourceRecord::new(2, vec![1.0; 3], vec![false; 2], 1);
        assert_eq!(
            catalog.push(bad),
            Err(StarcalError::RecordShapeMismatch {
                expected: 11,
                found: 5
            })
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_record_access_and_filter() {
        let schema = schema();
        let flux = schema.f64_key("psf_flux").unwrap();
        let cr = schema.flag_key("flag_cr").unwrap();
        let mut catalog = SourceCatalog::new(Arc::clone(&schema));
        for id in 0..4 {
            let mut record = catalog.empty_record(id);
            record.set(flux, id as f64 * 10.0);
            record.set_flag(cr, id % 2 == 1);
            catalog.push(record).unwrap();
        }

        assert_eq!(catalog.records()[2].get(flux), 20.0);
        assert!(catalog.records()[3].flag(cr));

        let kept = catalog.filtered(|r| !r.flag(cr));
        assert_eq!(kept.iter().map(|r| r.id).collect::<Vec<_>>(), vec![0, 2]);
        // the source catalog is untouched
        assert_eq!(catalog.len(), 4);
    }
}
