//! Linear algebra utilities
//!
//! Mathematical functions for Gaussian gating, Kalman updates and the small
//! geometric helpers needed by the helix model.

use nalgebra::{DMatrix, DVector};
use std::f64::consts::{PI, TAU};

/// Result of a single Kalman measurement update
#[derive(Debug, Clone)]
pub struct KalmanUpdate {
    /// Updated state mean
    pub mean: DVector<f64>,
    /// Updated state covariance (Joseph form, symmetrized)
    pub covariance: DMatrix<f64>,
    /// Chi-square contribution of the measurement (squared Mahalanobis distance)
    pub chi2: f64,
}

/// Squared Mahalanobis distance of a residual
///
/// # Arguments
/// * `residual` - Difference between measurement and prediction
/// * `sigma` - Covariance of the residual
///
/// # Returns
/// `None` when `sigma` is not positive definite
pub fn mahalanobis_squared(residual: &DVector<f64>, sigma: &DMatrix<f64>) -> Option<f64> {
    let chol = sigma.clone().cholesky()?;
    let solved = chol.solve(residual);
    Some(residual.dot(&solved))
}

/// Kalman filter update step
///
/// Performs a single Kalman filter measurement update with a pre-computed
/// innovation. The caller owns the residual definition so that angular
/// components can be wrapped before they reach the gain.
///
/// # Arguments
/// * `x_pred` - Predicted state mean
/// * `p_pred` - Predicted state covariance
/// * `innovation` - Measurement residual `z - h(x_pred)`
/// * `h` - Measurement Jacobian
/// * `r` - Measurement noise covariance
///
/// # Returns
/// `None` if the innovation covariance cannot be inverted
pub fn kalman_update(
    x_pred: &DVector<f64>,
    p_pred: &DMatrix<f64>,
    innovation: &DVector<f64>,
    h: &DMatrix<f64>,
    r: &DMatrix<f64>,
) -> Option<KalmanUpdate> {
    // Innovation covariance
    let s = h * p_pred * h.transpose() + r;

    // Kalman gain
    let chol = s.clone().cholesky()?;
    let k = p_pred * h.transpose() * chol.inverse();

    let chi2 = innovation.dot(&chol.solve(innovation));

    // Updated state
    let mean = x_pred + &k * innovation;

    // Updated covariance (Joseph form for numerical stability)
    let n = x_pred.len();
    let i_minus_kh = DMatrix::identity(n, n) - &k * h;
    let covariance = &i_minus_kh * p_pred * i_minus_kh.transpose() + &k * r * k.transpose();

    Some(KalmanUpdate {
        mean,
        covariance: symmetrize(&covariance),
        chi2,
    })
}

/// Make matrix symmetric
///
/// Ensures a matrix is symmetric by averaging with its transpose
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    0.5 * (matrix + matrix.transpose())
}

/// Wrap an angle into `(-π, π]`
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Check that every entry of a vector is finite
#[inline]
pub fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mahalanobis_identity() {
        let residual = DVector::from_vec(vec![3.0, 4.0]);
        let sigma = DMatrix::identity(2, 2);
        assert!((mahalanobis_squared(&residual, &sigma).unwrap() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_mahalanobis_singular() {
        let residual = DVector::from_vec(vec![1.0, 1.0]);
        let sigma = DMatrix::zeros(2, 2);
        assert!(mahalanobis_squared(&residual, &sigma).is_none());
    }

    #[test]
    fn test_kalman_update_reduces_covariance() {
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let p = DMatrix::identity(2, 2) * 4.0;
        let h = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let r = DMatrix::identity(1, 1);
        let innovation = DVector::from_vec(vec![1.0]);

        let upd = kalman_update(&x, &p, &innovation, &h, &r).unwrap();

        // Gain = 4 / (4 + 1)
        assert!((upd.mean[0] - 0.8).abs() < 1e-12);
        assert!(upd.mean[1].abs() < 1e-12);
        assert!((upd.covariance[(0, 0)] - 0.8).abs() < 1e-12);
        assert!((upd.covariance[(1, 1)] - 4.0).abs() < 1e-12);
        assert!((upd.chi2 - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_angle(TAU + 0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_symmetrize() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 1.0]);
        let s = symmetrize(&m);
        assert_eq!(s[(0, 1)], s[(1, 0)]);
    }
}
