//! Measurement update on a cylinder
//!
//! A TPC hit measures the local coordinates `[r·φ, z]` of the track on the
//! cylinder through the hit. With the state `[φ, z, ψ, tanλ, q/pT]` the
//! measurement model is linear:
//!
//! ```text
//! H = | r  0  0  0  0 |
//!     | 0  1  0  0  0 |
//! ```
//!
//! The azimuthal part of the innovation is wrapped before it reaches the gain,
//! so hits across the `±π` boundary update the state correctly.

use nalgebra::{DMatrix, DVector};

use crate::common::linalg::{kalman_update, mahalanobis_squared, wrap_angle};
use crate::follower::errors::TrackingError;
use crate::follower::traits::{Residual, UpdateResult};
use crate::types::{Measurement, TrackState, IDX_PHI, IDX_PSI, IDX_Z, STATE_DIM};

/// Measurement Jacobian for a cylinder of `radius`
pub fn measurement_matrix(radius: f64) -> DMatrix<f64> {
    let mut h = DMatrix::zeros(Measurement::DIM, STATE_DIM);
    h[(0, IDX_PHI)] = radius;
    h[(1, IDX_Z)] = 1.0;
    h
}

/// Innovation `[r·Δφ, Δz]` of a measurement against a state
pub fn innovation(predicted: &TrackState, measurement: &Measurement) -> DVector<f64> {
    DVector::from_vec(vec![
        predicted.radius * wrap_angle(measurement.phi - predicted.phi()),
        measurement.z() - predicted.z(),
    ])
}

/// Residual and its covariance `S = H × P × Hᵀ + V`
pub fn compute_residual(
    predicted: &TrackState,
    measurement: &Measurement,
) -> Result<Residual, TrackingError> {
    let h = measurement_matrix(predicted.radius);
    let covariance = &h * &predicted.covariance * h.transpose() + &measurement.covariance;
    let innovation = innovation(predicted, measurement);
    let chi2 = mahalanobis_squared(&innovation, &covariance).ok_or_else(|| {
        TrackingError::SingularMatrix {
            context: format!("residual covariance on layer {}", measurement.layer),
        }
    })?;
    Ok(Residual {
        innovation,
        covariance,
        chi2,
    })
}

/// Kalman update of a predicted state with one measurement
pub fn update_state(
    predicted: &TrackState,
    measurement: &Measurement,
) -> Result<UpdateResult, TrackingError> {
    let h = measurement_matrix(predicted.radius);
    let innovation = innovation(predicted, measurement);
    let updated = kalman_update(
        &predicted.params,
        &predicted.covariance,
        &innovation,
        &h,
        &measurement.covariance,
    )
    .ok_or_else(|| TrackingError::SingularMatrix {
        context: format!("innovation covariance on layer {}", measurement.layer),
    })?;

    let mut params = updated.mean;
    params[IDX_PHI] = wrap_angle(params[IDX_PHI]);
    params[IDX_PSI] = wrap_angle(params[IDX_PSI]);

    let state = TrackState::new(predicted.radius, params, updated.covariance);
    if !state.is_finite() {
        return Err(TrackingError::SingularMatrix {
            context: "updated state is not finite".to_string(),
        });
    }
    Ok(UpdateResult {
        state,
        chi2: updated.chi2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use std::f64::consts::PI;

    fn measurement_at(radius: f64, phi: f64, z: f64) -> Measurement {
        Measurement {
            hit: None,
            layer: 0,
            position: Point3::new(radius * phi.cos(), radius * phi.sin(), z),
            radius,
            phi,
            covariance: DMatrix::from_diagonal(&DVector::from_vec(vec![0.01, 0.01])),
        }
    }

    fn state_at(radius: f64, phi: f64, z: f64) -> TrackState {
        TrackState::from_parameters(
            radius,
            phi,
            z,
            phi,
            0.0,
            0.5,
            DMatrix::identity(STATE_DIM, STATE_DIM) * 1e-2,
        )
    }

    #[test]
    fn test_residual_chi2() {
        let state = state_at(40.0, 0.0, 0.0);
        let m = measurement_at(40.0, 0.0, 0.3);
        let residual = compute_residual(&state, &m).unwrap();
        // S_zz = 0.01 + 0.01
        assert!((residual.chi2 - 0.09 / 0.02).abs() < 1e-9);
        assert!(residual.innovation[0].abs() < 1e-12);
    }

    #[test]
    fn test_residual_wraps_phi() {
        let state = state_at(40.0, PI - 0.001, 0.0);
        let m = measurement_at(40.0, -PI + 0.001, 0.0);
        let residual = compute_residual(&state, &m).unwrap();
        assert!((residual.innovation[0] - 40.0 * 0.002).abs() < 1e-9);
    }

    #[test]
    fn test_update_pulls_towards_measurement() {
        let state = state_at(40.0, 0.0, 0.0);
        let m = measurement_at(40.0, 0.0, 1.0);
        let result = update_state(&state, &m).unwrap();
        assert!(result.state.z() > 0.4 && result.state.z() < 1.0);
        assert!(result.state.covariance[(IDX_Z, IDX_Z)] < state.covariance[(IDX_Z, IDX_Z)]);
        assert!(result.chi2 > 0.0);
    }
}
