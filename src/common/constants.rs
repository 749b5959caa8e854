//! Numerical and physical constants used throughout track following
//!
//! These are intentionally separate from the run-time configuration, which
//! lives in [`crate::types::config`].

/// Curvature conversion factor in GeV / (T · cm)
///
/// A particle with transverse momentum `pT` in a field `Bz` moves on a circle
/// of radius `R = pT / (C_LIGHT * Bz)` with `R` in cm.
pub const C_LIGHT: f64 = 0.299_792_458e-2;

/// Nominal solenoid field in Tesla used when no field map is available
pub const DEFAULT_BZ_TESLA: f64 = 1.4;

/// Transverse curvature (1/cm) below which a helix is propagated as a line
pub const STRAIGHT_LINE_CURVATURE: f64 = 1e-9;

/// Relative tolerance for the three-point collinearity test
///
/// The doubled triangle area is compared against the product of the two
/// chord lengths, so the test is scale free.
pub const COLLINEARITY_TOLERANCE: f64 = 1e-9;

/// Minimum distance (cm) between two seed points before they count as coincident
pub const COINCIDENCE_TOLERANCE: f64 = 1e-6;

/// Chi-square quantile for 2 degrees of freedom at 99.9%
pub const CHI2_2DOF_999: f64 = 13.815_510_557_964_274;

/// Chi-square values closer than this are treated as tied during association
pub const CHI2_TIE_TOLERANCE: f64 = 1e-9;

/// Floor of |cos α| between momentum and radial direction when widening a
/// search window for off-radius hits
pub const MIN_CROSSING_COSINE: f64 = 0.2;

/// Largest |q/pT| (1/GeV) used when estimating multiple scattering
///
/// Keeps the scattering angle finite for very soft or badly seeded tracks.
pub const MAX_SCATTERING_INV_PT: f64 = 20.0;

/// Relative step used for numerical Jacobians of the helix transport
pub const JACOBIAN_STEP: f64 = 1e-6;

/// Particle Data Group highland constant in GeV
pub const HIGHLAND_GEV: f64 = 0.0136;

/// Radiation length of a neon/CF4 drift gas in cm
pub const DEFAULT_GAS_RADIATION_LENGTH_CM: f64 = 8_500.0;
