//! Precise refit of finished tracks

use nalgebra::DVector;
use tpc_track_follower::follower::{RefitResult, Residual, UpdateResult};
use tpc_track_follower::types::{Direction, Measurement, Projection, Surface, TrackState};
use tpc_track_follower::{
    FieldModel, FitEngine, FollowContext, FollowerConfig, HelixKalmanFitter, TrackFollower,
    TrackingError,
};

use super::helpers::Scenario;

/// Refitting keeps the hit list and only replaces the states
#[test]
fn test_refit_keeps_hits() {
    let scenario = Scenario::smeared(15, 31);
    let growth = scenario.follow(FollowerConfig::default());
    let precise = scenario.follow(FollowerConfig::default().with_optimization_precise_fit(true));

    assert_eq!(growth.tracks.len(), precise.tracks.len());
    assert_eq!(precise.stats.refit_failures, 0);
    for (a, b) in growth.tracks.iter().zip(&precise.tracks) {
        assert!(!a.refitted);
        assert!(b.refitted);
        assert_eq!(a.hit_ids(), b.hit_ids());
        assert_eq!(a.layers(), b.layers());
        assert_eq!(b.ndf, 2 * b.num_measurements() - 5);

        let innermost = b.measurements_by_radius()[0].radius;
        assert!((b.inner_state.radius - innermost).abs() < 1e-6);
        assert_eq!(b.final_state.params, b.inner_state.params);
    }
}

/// Refitting the same measurements twice gives the same result
#[test]
fn test_refit_idempotent() {
    let scenario = Scenario::clean(3, 12);
    let output = scenario.follow(FollowerConfig::default().with_optimization_precise_fit(true));

    for track in &output.tracks {
        let measurements = track.measurements_by_radius();
        let again = scenario
            .fitter
            .refit(&measurements, &track.final_state, &scenario.field)
            .unwrap();
        assert!((again.chi2 - track.chi2).abs() < 1e-9 * (1.0 + track.chi2));
        assert_eq!(again.ndf, track.ndf);
        let drift = (&again.inner.params - &track.inner_state.params).norm();
        assert!(drift < 1e-9, "refit drifted by {}", drift);
    }
}

/// Fit engine whose refit always fails
struct NoRefit(HelixKalmanFitter);

impl FitEngine for NoRefit {
    fn create_state(&self, radius: f64, params: DVector<f64>) -> TrackState {
        self.0.create_state(radius, params)
    }

    fn initial_state(
        &self,
        measurements: &[Measurement],
        dir: Direction,
        field: &dyn FieldModel,
    ) -> Result<TrackState, TrackingError> {
        self.0.initial_state(measurements, dir, field)
    }

    fn predict(
        &self,
        state: &TrackState,
        target: &Surface,
        dir: Direction,
        field: &dyn FieldModel,
    ) -> Result<Projection, TrackingError> {
        self.0.predict(state, target, dir, field)
    }

    fn residual(
        &self,
        predicted: &TrackState,
        measurement: &Measurement,
    ) -> Result<Residual, TrackingError> {
        self.0.residual(predicted, measurement)
    }

    fn update(
        &self,
        predicted: &TrackState,
        measurement: &Measurement,
    ) -> Result<UpdateResult, TrackingError> {
        self.0.update(predicted, measurement)
    }

    fn refit(
        &self,
        _measurements: &[Measurement],
        _fallback: &TrackState,
        _field: &dyn FieldModel,
    ) -> Result<RefitResult, TrackingError> {
        Err(TrackingError::SingularMatrix {
            context: "refit disabled".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "no-refit"
    }
}

/// A failed refit keeps the growth states and is counted
#[test]
fn test_refit_failure_keeps_track() {
    let scenario = Scenario::clean(4, 44);
    let fitter = NoRefit(HelixKalmanFitter::default());
    let ctx = FollowContext::new(&scenario.field, &scenario.geometry, &scenario.lookup, &fitter);

    let follower =
        TrackFollower::new(FollowerConfig::default().with_optimization_precise_fit(true)).unwrap();
    let output = follower.follow_tracks(&scenario.event.seeds, &ctx).unwrap();

    assert_eq!(output.tracks.len(), 4);
    assert_eq!(output.stats.refit_failures, 4);
    for track in &output.tracks {
        assert!(!track.refitted);
        assert_eq!(track.num_measurements(), 48);
    }
}
