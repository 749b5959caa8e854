//! Core algorithmic components
//!
//! This module provides the numerical building blocks behind the fit engine:
//!
//! - [`prediction`] - Helix transport between cylinders with covariance
//! - [`update`] - Cylinder measurement model and Kalman update
//! - [`helix_fit`] - Circle and dip estimates from space points
//! - [`fitter`] - [`HelixKalmanFitter`], the reference fit engine

pub mod fitter;
pub mod helix_fit;
pub mod prediction;
pub mod update;

pub use fitter::HelixKalmanFitter;
pub use helix_fit::{estimate_helix, CircleMethod, HelixEstimate};
pub use prediction::{predict_state, Crossing, HelixSegment, ScatteringModel};
pub use update::{compute_residual, update_state};
