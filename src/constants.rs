//! # Constants and type definitions for starcal
//!
//! This module centralizes the **conversion factors**, **default thresholds**, and
//! **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Unit conversions (degrees ↔ radians, milliarcseconds ↔ radians, days ↔ Julian years)
//! - Default selection and statistics thresholds
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Milliarcseconds → radians
pub const RADMAS: f64 = RADSEC / 1000.0;

/// Arcseconds per degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Milliarcseconds per degree
pub const MAS_PER_DEG: f64 = 3_600_000.0;

/// Number of days in a Julian year
pub const JULIAN_YEAR_DAYS: f64 = 365.25;

/// Pogson ratio, 2.5 / ln(10), used to turn a relative flux error into a magnitude error
pub const POGSON: f64 = 1.085_736_204_758_129_6;

/// Scale factor turning an interquartile range into a Gaussian sigma (1 / 1.349)
pub const IQR_TO_SIGMA: f64 = 0.741_301_109_252_801;

// -------------------------------------------------------------------------------------------------
// Default thresholds
// -------------------------------------------------------------------------------------------------

/// Default signal-to-noise cut for the star selection
pub const DEFAULT_SN_CUT: f64 = 20.0;

/// Default faint magnitude limit, only used when a photometric calibration is supplied
pub const DEFAULT_MAX_MAG: f64 = 22.5;

/// Default magnitude error limit of the strict selection
pub const DEFAULT_MAX_MAG_ERR: f64 = 0.1;

/// Default flux-over-error inclusion threshold for the photometric repeatability
pub const DEFAULT_FLUX_LIMIT: f64 = 100.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Time span in Julian years
pub type Years = f64;
/// Astronomical magnitude
pub type Magnitude = f64;

/// Identifier of a visit (one exposure of the full camera)
pub type VisitId = u64;
/// Identifier of a chip (one detector of the camera)
pub type ChipId = u32;
