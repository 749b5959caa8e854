//! Directional Kalman track following
//!
//! This module provides:
//! - [`traits`] - Interfaces of the hit lookup, field and fit engine
//! - [`errors`] - [`TrackingError`]
//! - [`seeding`] - Seed to candidate conversion
//! - [`follow`] - [`TrackFollower`] and the bidirectional follow loop

pub mod errors;
pub mod follow;
pub mod seeding;
pub mod traits;

pub use errors::TrackingError;
pub use follow::{FollowOutput, FollowStats, PassEnd, PassOutcome, SeedOutcome, TrackFollower};
pub use seeding::SEED_HIT_TOLERANCE;
pub use traits::{FieldModel, FitEngine, HitLookup, RefitResult, Residual, UpdateResult};

use crate::types::DetectorGeometry;

/// Read-only inputs of one follow pass
///
/// Built by the caller per event; the follower never stores it.
#[derive(Clone, Copy)]
pub struct FollowContext<'a> {
    /// Magnetic field
    pub field: &'a dyn FieldModel,
    /// Detector layers
    pub geometry: &'a DetectorGeometry,
    /// Hits of the event
    pub lookup: &'a dyn HitLookup,
    /// State estimation engine
    pub fitter: &'a dyn FitEngine,
}

impl<'a> FollowContext<'a> {
    /// Bundle the inputs of a follow pass
    pub fn new(
        field: &'a dyn FieldModel,
        geometry: &'a DetectorGeometry,
        lookup: &'a dyn HitLookup,
        fitter: &'a dyn FitEngine,
    ) -> Self {
        Self {
            field,
            geometry,
            lookup,
            fitter,
        }
    }
}

impl std::fmt::Debug for FollowContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowContext")
            .field("field", &self.field.name())
            .field("layers", &self.geometry.num_layers())
            .field("hits", &self.lookup.len())
            .field("fitter", &self.fitter.name())
            .finish()
    }
}
