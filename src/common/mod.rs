//! Low-level utilities
//!
//! This module contains:
//! - [`constants`] - Physical constants and numerical tolerances
//! - [`linalg`] - Linear algebra helpers
//! - [`ground_truth`] - Synthetic event generation

pub mod constants;
pub mod ground_truth;
pub mod linalg;
