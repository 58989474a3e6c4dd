use std::fmt;

use ahash::RandomState;
use std::collections::HashMap;

use crate::starcal_errors::StarcalError;

/// Handle to a floating-point column of a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct F64Key(pub(crate) usize);

/// Handle to a boolean flag column of a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagKey(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKey {
    F64(F64Key),
    Flag(FlagKey),
}

/// Column layout of a detection catalog.
///
/// Fields are looked up by name once (for instance when a selector is configured) and
/// the returned keys are then used to read every record without any further string
/// handling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    names: Vec<String>,
    fields: HashMap<String, FieldKey, RandomState>,
    n_f64: usize,
    n_flags: usize,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a floating-point column. Adding an existing name returns the existing key
    /// when its type matches.
    pub fn add_f64(&mut self, name: &str) -> Result<F64Key, StarcalError> {
        match self.fields.get(name) {
            Some(FieldKey::F64(key)) => Ok(*key),
            Some(FieldKey::Flag(_)) => Err(StarcalError::FieldTypeMismatch(name.to_string())),
            None => {
                let key = F64Key(self.n_f64);
                self.n_f64 += 1;
                self.names.push(name.to_string());
                self.fields.insert(name.to_string(), FieldKey::F64(key));
                Ok(key)
            }
        }
    }

    /// Add a boolean flag column. Adding an existing name returns the existing key
    /// when its type matches.
    pub fn add_flag(&mut self, name: &str) -> Result<FlagKey, StarcalError> {
        match self.fields.get(name) {
            Some(FieldKey::Flag(key)) => Ok(*key),
            Some(FieldKey::F64(_)) => Err(StarcalError::FieldTypeMismatch(name.to_string())),
            None => {
                let key = FlagKey(self.n_flags);
                self.n_flags += 1;
                self.names.push(name.to_string());
                self.fields.insert(name.to_string(), FieldKey::Flag(key));
                Ok(key)
            }
        }
    }

    /// Resolve a floating-point column by name.
    ///
    /// Errors
    /// ------
    /// * [`StarcalError::UnknownField`] if no column has this name.
    /// * [`StarcalError::FieldTypeMismatch`] if the column is a flag.
    pub fn f64_key(&self, name: &str) -> Result<F64Key, StarcalError> {
        match self.fields.get(name) {
            Some(FieldKey::F64(key)) => Ok(*key),
            Some(FieldKey::Flag(_)) => Err(StarcalError::FieldTypeMismatch(name.to_string())),
            None => Err(StarcalError::UnknownField(name.to_string())),
        }
    }

    /// Resolve a flag column by name, see [`Schema::f64_key`].
    pub fn flag_key(&self, name: &str) -> Result<FlagKey, StarcalError> {
        match self.fields.get(name) {
            Some(FieldKey::Flag(key)) => Ok(*key),
            Some(FieldKey::F64(_)) => Err(StarcalError::FieldTypeMismatch(name.to_string())),
            None => Err(StarcalError::UnknownField(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of floating-point columns.
    pub fn f64_count(&self) -> usize {
        self.n_f64
    }

    /// Number of flag columns.
    pub fn flag_count(&self) -> usize {
        self.n_flags
    }

    /// Column names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Schema({} float columns, {} flags)",
            self.n_f64, self.n_flags
        )
    }
}

#[cfg(test)]
mod schema_test {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut schema = Schema::new();
        let flux = schema.add_f64("psf_flux").unwrap();
        let sat = schema.add_flag("flag_saturated").unwrap();
        let err = schema.add_f64("psf_fluxErr").unwrap();

        assert_eq!(schema.f64_key("psf_flux"), Ok(flux));
        assert_eq!(schema.f64_key("psf_fluxErr"), Ok(err));
        assert_eq!(schema.flag_key("flag_saturated"), Ok(sat));
        assert_eq!(schema.f64_count(), 2);
        assert_eq!(schema.flag_count(), 1);
        assert_eq!(
            schema.names().collect::<Vec<_>>(),
            vec!["psf_flux", "flag_saturated", "psf_fluxErr"]
        );
    }

    #[test]
    fn test_lookup_errors() {
        let mut schema = Schema::new();
        schema.add_f64("psf_flux").unwrap();
        schema.add_flag("flag_cr").unwrap();

        assert_eq!(
            schema.f64_key("ap_flux"),
            Err(StarcalError::UnknownField("ap_flux".into()))
        );
        assert_eq!(
            schema.f64_key("flag_cr"),
            Err(StarcalError::FieldTypeMismatch("flag_cr".into()))
        );
        assert_eq!(
            schema.add_flag("psf_flux"),
            Err(StarcalError::FieldTypeMismatch("psf_flux".into()))
        );
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut schema = Schema::new();
        let a = schema.add_f64("x").unwrap();
        let b = schema.add_f64("x").unwrap();
        assert_eq!(a, b);
        assert_eq!(schema.f64_count(), 1);
    }
}
