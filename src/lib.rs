pub mod catalog;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod exposure_catalog;
pub mod match_exposure;
pub mod selection;
pub mod sky;
pub mod star;
pub mod starcal_errors;
pub mod statistics;
pub mod wcs;

pub use config::CalibrationConfig;
pub use exposure_catalog::{ExposureCatalog, ExposureKey, TangentPoint};
pub use starcal_errors::StarcalError;
pub use statistics::{compute_rms, ProcessedExposure, RmsStatistics};
