//! Interfaces of the collaborators the follower consumes
//!
//! The follower never owns these: the caller builds them once (field, fit
//! engine) or once per event (hit lookup) and passes them in read-only through
//! [`super::FollowContext`].

use nalgebra::{DMatrix, DVector, Point3, Vector3};

use crate::types::{
    Direction, Hit, HitId, Measurement, Projection, SearchWindow, Surface, TrackState,
};

use super::errors::TrackingError;

/// Magnetic field provider
///
/// Implementations:
/// - `UniformField` - constant field vector
/// - `SolenoidField` - ideal finite solenoid
pub trait FieldModel: Send + Sync {
    /// Field vector (T) at a point (cm)
    fn value_at(&self, point: &Point3<f64>) -> Vector3<f64>;

    /// Longitudinal field component at a point
    fn bz_at(&self, point: &Point3<f64>) -> f64 {
        self.value_at(point).z
    }

    /// Get model name
    fn name(&self) -> &'static str;
}

/// Per-event spatial index of hits
///
/// Populated by [`HitLookup::init`] before following and cleared after. All
/// queries take `&self`, so concurrent follow computations may share one
/// lookup.
pub trait HitLookup: Send + Sync {
    /// Index a new event; hit ids are positions in `positions`
    fn init(&mut self, positions: &[Point3<f64>]);

    /// Hits on `layer` inside `window` around `center`
    fn query_window(&self, layer: usize, center: &Point3<f64>, window: &SearchWindow) -> Vec<&Hit>;

    /// Hit by id
    fn hit(&self, id: HitId) -> Option<&Hit>;

    /// The indexed hit at `point`, if one lies within `tolerance` (cm)
    fn locate(&self, point: &Point3<f64>, tolerance: f64) -> Option<&Hit>;

    /// Drop all hits of the current event
    fn clear(&mut self);

    /// Number of indexed hits
    fn len(&self) -> usize;

    /// One past the largest hit id of the current event
    fn id_bound(&self) -> usize;

    /// True if no hits are indexed
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a measurement update
#[derive(Debug, Clone)]
pub struct UpdateResult {
    /// Filtered state
    pub state: TrackState,
    /// Chi-square increment
    pub chi2: f64,
}

/// Predicted residual of a measurement, used for gating
#[derive(Debug, Clone)]
pub struct Residual {
    /// Measurement minus prediction in `[r·φ, z]`
    pub innovation: DVector<f64>,
    /// Residual covariance (prediction plus measurement)
    pub covariance: DMatrix<f64>,
    /// Squared Mahalanobis distance
    pub chi2: f64,
}

/// Result of a full-track refit
#[derive(Debug, Clone)]
pub struct RefitResult {
    /// State at the innermost measurement
    pub inner: TrackState,
    /// State at the outermost measurement
    pub outer: TrackState,
    /// Total chi-square
    pub chi2: f64,
    /// Degrees of freedom
    pub ndf: usize,
}

/// Track-state estimation engine
///
/// Owns the state representation and provides Kalman prediction and update.
///
/// Implementations:
/// - `HelixKalmanFitter` - locally uniform field helix model
pub trait FitEngine: Send + Sync {
    /// Wrap raw parameters on the cylinder `radius` with the engine's seed
    /// covariance
    fn create_state(&self, radius: f64, params: DVector<f64>) -> TrackState;

    /// Build a state from raw seed measurements ordered by increasing radius
    ///
    /// The returned state sits on the last measurement in travel order:
    /// the outermost for `Outward`, the innermost for `Inward`.
    fn initial_state(
        &self,
        measurements: &[Measurement],
        dir: Direction,
        field: &dyn FieldModel,
    ) -> Result<TrackState, TrackingError>;

    /// Extrapolate a state to a surface
    fn predict(
        &self,
        state: &TrackState,
        target: &Surface,
        dir: Direction,
        field: &dyn FieldModel,
    ) -> Result<Projection, TrackingError>;

    /// Predicted residual of a measurement against a state
    fn residual(
        &self,
        predicted: &TrackState,
        measurement: &Measurement,
    ) -> Result<Residual, TrackingError>;

    /// Incorporate a measurement into a predicted state
    fn update(
        &self,
        predicted: &TrackState,
        measurement: &Measurement,
    ) -> Result<UpdateResult, TrackingError>;

    /// Refit a complete measurement list ordered by increasing radius
    ///
    /// `fallback` is used as the starting point when the measurements alone
    /// cannot define one.
    fn refit(
        &self,
        measurements: &[Measurement],
        fallback: &TrackState,
        field: &dyn FieldModel,
    ) -> Result<RefitResult, TrackingError>;

    /// Get engine name
    fn name(&self) -> &'static str;
}
