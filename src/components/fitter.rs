//! Helix Kalman fit engine
//!
//! [`HelixKalmanFitter`] is the reference [`FitEngine`]: helix prediction in
//! the local longitudinal field, cylinder measurement updates, seed fits over
//! raw points and a forward-backward refit over a finished hit list.

use nalgebra::{DMatrix, DVector, Point3};

use crate::follower::errors::TrackingError;
use crate::follower::traits::{FieldModel, FitEngine, RefitResult, Residual, UpdateResult};
use crate::types::{
    Direction, FitterConfig, Measurement, Projection, Surface, TrackState, IDX_PHI, IDX_PSI,
    IDX_Q_OVER_PT, IDX_TAN_LAMBDA, IDX_Z,
};

use super::helix_fit::{estimate_helix, CircleMethod};
use super::prediction::{predict_state, ScatteringModel};
use super::update::{compute_residual, update_state};

/// Kalman fitter for helices in a solenoid field
#[derive(Debug, Clone)]
pub struct HelixKalmanFitter {
    config: FitterConfig,
    scattering: ScatteringModel,
}

impl HelixKalmanFitter {
    /// Create a new fitter
    pub fn new(config: FitterConfig) -> Result<Self, TrackingError> {
        config.validate()?;
        let scattering = ScatteringModel::new(config.radiation_length);
        Ok(Self { config, scattering })
    }

    /// Fitter configuration
    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    /// Seed covariance scaled by `scale`
    fn seed_covariance(&self, params: &DVector<f64>, scale: f64) -> DMatrix<f64> {
        let c = &self.config;
        let sigma_q = (c.initial_relative_sigma_q_over_pt * params[IDX_Q_OVER_PT].abs())
            .max(c.initial_min_sigma_q_over_pt);
        let mut variances = DVector::zeros(params.len());
        variances[IDX_PHI] = c.initial_sigma_phi.powi(2);
        variances[IDX_Z] = c.initial_sigma_z.powi(2);
        variances[IDX_PSI] = c.initial_sigma_psi.powi(2);
        variances[IDX_TAN_LAMBDA] = c.initial_sigma_tan_lambda.powi(2);
        variances[IDX_Q_OVER_PT] = sigma_q * sigma_q;
        DMatrix::from_diagonal(&(variances * scale))
    }

    /// Sequential Kalman filter over measurements in travel order
    ///
    /// Returns the state on the last measurement and the accumulated chi-square.
    fn filter<'m>(
        &self,
        start: TrackState,
        measurements: impl Iterator<Item = &'m Measurement>,
        dir: Direction,
        field: &dyn FieldModel,
    ) -> Result<(TrackState, f64), TrackingError> {
        let mut state = start;
        let mut chi2 = 0.0;
        for measurement in measurements {
            let projection =
                self.predict(&state, &Surface::Point(measurement.position), dir, field)?;
            let updated = self.update(&projection.state, measurement)?;
            chi2 += updated.chi2;
            state = updated.state;
        }
        Ok((state, chi2))
    }

    /// Inflated copy of a state, used to start a new filter pass
    fn inflated(&self, state: &TrackState) -> TrackState {
        TrackState::new(
            state.radius,
            state.params.clone(),
            &state.covariance * self.config.inflation,
        )
    }

    /// Least-squares helix state on `point`, with inflated seed covariance
    fn fitted_start(
        &self,
        positions: &[Point3<f64>],
        point: &Point3<f64>,
        allow_straight: bool,
        field: &dyn FieldModel,
    ) -> Result<TrackState, TrackingError> {
        let estimate = estimate_helix(positions, CircleMethod::LeastSquares, allow_straight)?;
        let (radius, params) = estimate.state_params(point, field.bz_at(point))?;
        let covariance = self.seed_covariance(&params, self.config.inflation);
        Ok(TrackState::new(radius, params, covariance))
    }
}

impl Default for HelixKalmanFitter {
    fn default() -> Self {
        let config = FitterConfig::default();
        let scattering = ScatteringModel::new(config.radiation_length);
        Self { config, scattering }
    }
}

impl FitEngine for HelixKalmanFitter {
    fn create_state(&self, radius: f64, params: DVector<f64>) -> TrackState {
        let covariance = self.seed_covariance(&params, 1.0);
        TrackState::new(radius, params, covariance)
    }

    fn initial_state(
        &self,
        measurements: &[Measurement],
        dir: Direction,
        field: &dyn FieldModel,
    ) -> Result<TrackState, TrackingError> {
        let positions: Vec<Point3<f64>> = measurements.iter().map(|m| m.position).collect();
        let ordered: Vec<&Measurement> = match dir {
            Direction::Outward => measurements.iter().collect(),
            Direction::Inward => measurements.iter().rev().collect(),
        };
        let first = ordered
            .first()
            .ok_or_else(|| TrackingError::degenerate("no seed measurements"))?;

        let start = self.fitted_start(&positions, &first.position, false, field)?;
        let (state, _) = self.filter(start, ordered.into_iter(), dir, field)?;
        Ok(state)
    }

    fn predict(
        &self,
        state: &TrackState,
        target: &Surface,
        dir: Direction,
        field: &dyn FieldModel,
    ) -> Result<Projection, TrackingError> {
        let bz = field.bz_at(&state.position());
        if !bz.is_finite() {
            return Err(TrackingError::MissingField);
        }
        predict_state(state, target, dir.sense(), bz, &self.scattering)
    }

    fn residual(
        &self,
        predicted: &TrackState,
        measurement: &Measurement,
    ) -> Result<Residual, TrackingError> {
        compute_residual(predicted, measurement)
    }

    fn update(
        &self,
        predicted: &TrackState,
        measurement: &Measurement,
    ) -> Result<UpdateResult, TrackingError> {
        update_state(predicted, measurement)
    }

    fn refit(
        &self,
        measurements: &[Measurement],
        fallback: &TrackState,
        field: &dyn FieldModel,
    ) -> Result<RefitResult, TrackingError> {
        let Some(innermost) = measurements.first() else {
            return Err(TrackingError::degenerate("no measurements to refit"));
        };
        let positions: Vec<Point3<f64>> = measurements.iter().map(|m| m.position).collect();

        let start = match self.fitted_start(&positions, &innermost.position, true, field) {
            Ok(state) => state,
            Err(err) => {
                log::debug!("Refit starts from the growth state: {}", err);
                let dir = if innermost.radius < fallback.radius {
                    Direction::Inward
                } else {
                    Direction::Outward
                };
                let projected =
                    self.predict(fallback, &Surface::Point(innermost.position), dir, field)?;
                self.inflated(&projected.state)
            }
        };

        // Forward inner to outer, then backward from the inflated outer state
        let (forward, _) = self.filter(start, measurements.iter(), Direction::Outward, field)?;
        let (inner, chi2) = self.filter(
            self.inflated(&forward),
            measurements.iter().rev(),
            Direction::Inward,
            field,
        )?;

        // Outer state from a final forward pass seeded by the smoothed inner one
        let (outer, _) = self.filter(
            self.inflated(&inner),
            measurements.iter(),
            Direction::Outward,
            field,
        )?;

        Ok(RefitResult {
            inner,
            outer,
            chi2,
            ndf: (2 * measurements.len()).saturating_sub(5),
        })
    }

    fn name(&self) -> &'static str {
        "helix-kalman"
    }
}
