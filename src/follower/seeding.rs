//! Seed to track-candidate conversion
//!
//! A seed becomes a [`TrackCandidate`] by resolving its points to detector
//! layers and lookup hits, building measurements, and estimating the start
//! state on the configured start hit:
//!
//! - helix mode: exact circle through the innermost, middle and outermost
//!   point, dip from a line fit of `z` against arc length
//! - precise mode: the fit engine's initial state over all seed points
//!
//! Collinear seeds are degenerate in both modes unless straight seeds are
//! explicitly allowed.

use nalgebra::Point3;
use smallvec::SmallVec;

use crate::components::helix_fit::{estimate_helix, is_collinear, validate_points, CircleMethod};
use crate::types::{Direction, HitId, Measurement, Seed, StartPoint, TrackCandidate, TrackState};

use super::errors::TrackingError;
use super::follow::TrackFollower;
use super::FollowContext;

/// Distance (cm) within which a seed point is identified with a lookup hit
pub const SEED_HIT_TOLERANCE: f64 = 1e-4;

impl TrackFollower {
    /// Convert a hit position into a measurement on `layer`
    ///
    /// Uses the layer's resolution from the configured resolution model.
    ///
    /// # Errors
    /// `NonFiniteHit` if any coordinate is NaN or infinite.
    pub fn hit_to_measurement(
        &self,
        position: &Point3<f64>,
        layer: usize,
    ) -> Result<Measurement, TrackingError> {
        if !position.coords.iter().all(|c| c.is_finite()) {
            return Err(TrackingError::NonFiniteHit);
        }
        let resolution = self.config().resolution.for_layer(layer);
        Ok(Measurement {
            hit: None,
            layer,
            position: *position,
            radius: position.x.hypot(position.y),
            phi: position.y.atan2(position.x),
            covariance: nalgebra::DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![
                resolution.rphi * resolution.rphi,
                resolution.z * resolution.z,
            ])),
        })
    }

    /// Build the track candidate of one seed
    ///
    /// # Errors
    /// `DegenerateSeed` for too few, coincident or collinear points, or points
    /// off every detector layer; `NonFiniteHit` for non-finite points; any
    /// error of the fit engine's initial state in precise mode.
    pub fn candidate_to_track(
        &self,
        seed_index: usize,
        seed: &Seed,
        ctx: &FollowContext<'_>,
    ) -> Result<TrackCandidate, TrackingError> {
        let points = seed.ordered_by_radius();
        validate_points(&points)?;

        let mut measurements = Vec::with_capacity(points.len());
        let mut seed_hits: SmallVec<[HitId; 4]> = SmallVec::new();
        for point in &points {
            let layer = ctx
                .geometry
                .layer_of(point.x.hypot(point.y))
                .ok_or_else(|| TrackingError::degenerate("seed point off every layer"))?;
            let mut measurement = self.hit_to_measurement(point, layer)?;
            if let Some(hit) = ctx.lookup.locate(point, SEED_HIT_TOLERANCE) {
                seed_hits.push(hit.id);
                measurement = measurement.with_hit(hit.id);
            }
            measurements.push(measurement);
        }

        let (start_index, dir) = match self.config().start_point {
            StartPoint::Outermost => (points.len() - 1, Direction::Outward),
            StartPoint::Innermost => (0, Direction::Inward),
        };

        let straight = is_collinear(&points);
        if straight && !self.config().allow_straight_seeds {
            return Err(TrackingError::degenerate("collinear seed points"));
        }

        let state = if self.config().optimization_helix || straight {
            self.helix_state(&points, start_index, ctx)?
        } else {
            ctx.fitter.initial_state(&measurements, dir, ctx.field)?
        };

        if seed.charge() != 0 && state.charge() != 0 && seed.charge() != state.charge() {
            log::debug!(
                "Seed {}: fitted charge {} disagrees with seed charge {}",
                seed_index,
                state.charge(),
                seed.charge()
            );
        }

        let start = measurements.swap_remove(start_index);
        Ok(TrackCandidate::new(seed_index, state, start, seed_hits))
    }

    /// Analytic helix state on the seed point `start_index`
    fn helix_state(
        &self,
        points: &[Point3<f64>],
        start_index: usize,
        ctx: &FollowContext<'_>,
    ) -> Result<TrackState, TrackingError> {
        let estimate = estimate_helix(
            points,
            CircleMethod::ThreePoint,
            self.config().allow_straight_seeds,
        )?;
        let start = &points[start_index];
        let (radius, params) = estimate.state_params(start, ctx.field.bz_at(start))?;
        Ok(ctx.fitter.create_state(radius, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::LayeredHitLookup;
    use crate::components::HelixKalmanFitter;
    use crate::field::UniformField;
    use crate::follower::traits::HitLookup;
    use crate::types::{DetectorGeometry, FollowerConfig};

    fn arc_seed() -> Seed {
        // Negative 1 GeV track from the origin, points at r = 30, 31, 32
        let h = crate::common::constants::C_LIGHT * 1.4;
        let segment = crate::components::HelixSegment::new(Point3::origin(), 0.2, 0.3, h);
        Seed::new(
            [32.0, 30.0, 31.0]
                .iter()
                .map(|&r| segment.intersect_cylinder(r, 1.0).unwrap().position),
            -1,
            h,
        )
    }

    #[test]
    fn test_candidate_both_modes() {
        let geometry = DetectorGeometry::uniform(5, 30.0, 34.0, 100.0).unwrap();
        let mut lookup = LayeredHitLookup::new(geometry.clone());
        let seed = arc_seed();
        lookup.init(seed.points());
        let field = UniformField::new(1.4);
        let fitter = HelixKalmanFitter::default();
        let ctx = FollowContext::new(&field, &geometry, &lookup, &fitter);

        for helix in [true, false] {
            let config = FollowerConfig::default().with_optimization_helix(helix);
            let follower = TrackFollower::new(config).unwrap();
            let candidate = follower.candidate_to_track(0, &seed, &ctx).unwrap();
            assert_eq!(candidate.start_layer(), 2);
            assert_eq!(candidate.seed_hits.len(), 3);
            assert!((candidate.start_state.radius - 32.0).abs() < 1e-6);
            assert!((candidate.start_state.q_over_pt() + 1.0).abs() < 0.02);
            assert!((candidate.start_state.tan_lambda() - 0.3).abs() < 1e-3);
        }
    }

    #[test]
    fn test_collinear_seed_rejected() {
        let geometry = DetectorGeometry::uniform(5, 30.0, 34.0, 100.0).unwrap();
        let lookup = LayeredHitLookup::new(geometry.clone());
        let field = UniformField::new(1.4);
        let fitter = HelixKalmanFitter::default();
        let ctx = FollowContext::new(&field, &geometry, &lookup, &fitter);
        let seed = Seed::from_points([
            Point3::new(30.0, 0.0, 0.0),
            Point3::new(31.0, 0.0, 0.5),
            Point3::new(32.0, 0.0, 1.0),
        ]);

        for helix in [true, false] {
            let config = FollowerConfig::default().with_optimization_helix(helix);
            let follower = TrackFollower::new(config).unwrap();
            assert!(matches!(
                follower.candidate_to_track(0, &seed, &ctx),
                Err(TrackingError::DegenerateSeed { .. })
            ));
        }

        let follower =
            TrackFollower::new(FollowerConfig::default().with_allow_straight_seeds(true)).unwrap();
        let candidate = follower.candidate_to_track(0, &seed, &ctx).unwrap();
        assert_eq!(candidate.start_state.q_over_pt(), 0.0);
        assert!(candidate.seed_hits.is_empty());
    }

    #[test]
    fn test_hit_to_measurement() {
        let follower = TrackFollower::new(FollowerConfig::default()).unwrap();
        let m = follower.hit_to_measurement(&Point3::new(0.0, 40.0, 3.0), 10).unwrap();
        assert!((m.radius - 40.0).abs() < 1e-12);
        assert!((m.covariance[(0, 0)] - 0.02f64.powi(2)).abs() < 1e-15);
        assert_eq!(
            follower
                .hit_to_measurement(&Point3::new(f64::INFINITY, 0.0, 0.0), 0)
                .unwrap_err(),
            TrackingError::NonFiniteHit
        );
    }
}
