//! Hit association for track following
//!
//! This module provides:
//! - [`lookup`] - Layered hit index with azimuthal window queries
//! - [`gating`] - Chi-square gate and best-candidate selection
//! - [`claims`] - Hit ownership for exclusive sharing

pub mod claims;
pub mod gating;
pub mod lookup;

pub use claims::HitClaims;
pub use gating::{gate_candidates, radial_margin, search_window, select_best, GateCandidate};
pub use lookup::LayeredHitLookup;
