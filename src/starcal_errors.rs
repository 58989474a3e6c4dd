use thiserror::Error;

use crate::exposure_catalog::{ExposureKey, TangentPoint};

#[derive(Error, Debug)]
pub enum StarcalError {
    #[error("Unknown field in the catalog schema: {0}")]
    UnknownField(String),

    #[error("Field has the wrong type for this use: {0}")]
    FieldTypeMismatch(String),

    #[error("Record does not match its schema: expected {expected} values, found {found}")]
    RecordShapeMismatch { expected: usize, found: usize },

    #[error("Tangent point already set to {current}, refusing to change it to {requested}")]
    TangentPointConflict {
        current: TangentPoint,
        requested: TangentPoint,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("No exposure provided a tangent point")]
    MissingTangentPoint,

    #[error("No fitted mapping for exposure {0}")]
    MissingMapping(ExposureKey),

    #[error("Astrometric solver failed: {0}")]
    SolverFailure(String),
}

impl PartialEq for StarcalError {
    fn eq(&self, other: &Self) -> bool {
        use StarcalError::*;
        match (self, other) {
            (UnknownField(a), UnknownField(b)) => a == b,
            (FieldTypeMismatch(a), FieldTypeMismatch(b)) => a == b,
            (
                RecordShapeMismatch {
                    expected: e1,
                    found: f1,
                },
                RecordShapeMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (
                TangentPointConflict {
                    current: c1,
                    requested: r1,
                },
                TangentPointConflict {
                    current: c2,
                    requested: r2,
                },
            ) => c1 == c2 && r1 == r2,
            (InvalidConfiguration(a), InvalidConfiguration(b)) => a == b,
            (InvalidCoordinates(a), InvalidCoordinates(b)) => a == b,
            (MissingMapping(a), MissingMapping(b)) => a == b,
            (SolverFailure(a), SolverFailure(b)) => a == b,

            (MissingTangentPoint, MissingTangentPoint) => true,

            _ => false,
        }
    }
}
