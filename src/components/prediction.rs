//! State prediction by helix transport between cylinders
//!
//! In a locally uniform solenoid field a charged track is a helix. Along the
//! transverse path length `s`, with signed transverse curvature `h`:
//!
//! - `x(s) = x0 + (sin(ψ0 + h·s) − sin ψ0) / h`
//! - `y(s) = y0 − (cos(ψ0 + h·s) − cos ψ0) / h`
//! - `z(s) = z0 + s · tanλ`
//! - `ψ(s) = ψ0 + h·s`
//!
//! Prediction intersects that helix with the target cylinder, picking the
//! nearest crossing in the direction of travel, and transports the covariance
//! with a numerical Jacobian plus multiple-scattering process noise:
//! `Σ' = J × Σ × Jᵀ + Q`.

use std::f64::consts::{PI, TAU};

use nalgebra::{DMatrix, DVector, Point3};

use crate::common::constants::{
    C_LIGHT, HIGHLAND_GEV, JACOBIAN_STEP, MAX_SCATTERING_INV_PT, STRAIGHT_LINE_CURVATURE,
};
use crate::common::linalg::{symmetrize, wrap_angle};
use crate::follower::errors::TrackingError;
use crate::types::{
    Projection, Surface, TrackState, IDX_PHI, IDX_PSI, IDX_Q_OVER_PT, IDX_TAN_LAMBDA, IDX_Z,
    STATE_DIM,
};

/// Path lengths (cm) below this are treated as zero
const PATH_TOLERANCE: f64 = 1e-9;

/// Relative tolerance on squared radii when a crossing is tangent
const ROOT_TOLERANCE: f64 = 1e-12;

/// One helix turn segment starting at `origin`
#[derive(Debug, Clone, PartialEq)]
pub struct HelixSegment {
    /// Starting point
    pub origin: Point3<f64>,
    /// Transverse momentum azimuth at the origin
    pub psi: f64,
    /// Dip slope
    pub tan_lambda: f64,
    /// Signed transverse curvature (1/cm), positive turns counter-clockwise
    pub curvature: f64,
}

/// Where a helix crosses a cylinder
#[derive(Debug, Clone, PartialEq)]
pub struct Crossing {
    /// Signed transverse path length from the origin
    pub path_length: f64,
    /// Crossing point
    pub position: Point3<f64>,
    /// Momentum azimuth at the crossing
    pub psi: f64,
}

impl HelixSegment {
    /// Create a new segment
    pub fn new(origin: Point3<f64>, psi: f64, tan_lambda: f64, curvature: f64) -> Self {
        Self {
            origin,
            psi,
            tan_lambda,
            curvature,
        }
    }

    /// Segment through a track state in a field `bz`
    pub fn from_state(state: &TrackState, bz: f64) -> Self {
        Self::new(
            state.position(),
            state.psi(),
            state.tan_lambda(),
            state.transverse_curvature(bz),
        )
    }

    /// True if the segment is propagated as a straight line
    #[inline]
    pub fn is_straight(&self) -> bool {
        self.curvature.abs() < STRAIGHT_LINE_CURVATURE
    }

    /// Centre of the transverse circle
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.is_straight() {
            return None;
        }
        let h = self.curvature;
        Some((
            self.origin.x - self.psi.sin() / h,
            self.origin.y + self.psi.cos() / h,
        ))
    }

    /// Position after a transverse path length `s`
    pub fn position_at(&self, s: f64) -> Point3<f64> {
        let (x, y) = if self.is_straight() {
            (
                self.origin.x + s * self.psi.cos(),
                self.origin.y + s * self.psi.sin(),
            )
        } else {
            let h = self.curvature;
            let turned = self.psi + h * s;
            (
                self.origin.x + (turned.sin() - self.psi.sin()) / h,
                self.origin.y - (turned.cos() - self.psi.cos()) / h,
            )
        };
        Point3::new(x, y, self.origin.z + s * self.tan_lambda)
    }

    /// Momentum azimuth after a transverse path length `s`
    pub fn direction_at(&self, s: f64) -> f64 {
        if self.is_straight() {
            wrap_angle(self.psi)
        } else {
            wrap_angle(self.psi + self.curvature * s)
        }
    }

    /// Nearest crossing with the cylinder of `radius` in direction `sense`
    ///
    /// `sense` is `+1` to travel along the momentum and `-1` against it.
    /// Returns `None` if the helix never reaches the cylinder, or only does so
    /// after turning back by more than half a revolution.
    pub fn intersect_cylinder(&self, radius: f64, sense: f64) -> Option<Crossing> {
        let path = if self.is_straight() {
            self.line_path(radius, sense)?
        } else {
            self.arc_path(radius, sense)?
        };
        Some(Crossing {
            path_length: path,
            position: self.position_at(path),
            psi: self.direction_at(path),
        })
    }

    fn line_path(&self, radius: f64, sense: f64) -> Option<f64> {
        let (ux, uy) = (self.psi.cos(), self.psi.sin());
        let b = self.origin.x * ux + self.origin.y * uy;
        let c = self.origin.x.powi(2) + self.origin.y.powi(2) - radius * radius;
        let mut disc = b * b - c;
        if disc < 0.0 {
            if disc > -ROOT_TOLERANCE * radius * radius {
                disc = 0.0;
            } else {
                return None;
            }
        }
        let root = disc.sqrt();
        nearest_in_sense([-b - root, -b + root].into_iter(), sense)
    }

    fn arc_path(&self, radius: f64, sense: f64) -> Option<f64> {
        let h = self.curvature;
        let (cx, cy) = self.center()?;
        let rho = 1.0 / h.abs();
        let d = cx.hypot(cy);
        if d < PATH_TOLERANCE {
            // Circle concentric with the cylinder
            return None;
        }

        // Circle-circle intersection: foot point at distance `a` along the
        // centre direction, offset `q` perpendicular to it
        let a = (radius * radius - rho * rho + d * d) / (2.0 * d);
        let mut q2 = radius * radius - a * a;
        if q2 < 0.0 {
            if q2 > -ROOT_TOLERANCE * radius * radius {
                q2 = 0.0;
            } else {
                return None;
            }
        }
        let q = q2.sqrt();
        let (ex, ey) = (cx / d, cy / d);
        let crossings = [
            (a * ex - q * ey, a * ey + q * ex),
            (a * ex + q * ey, a * ey - q * ex),
        ];

        let turn_sign = sense * h.signum();
        let paths = crossings.into_iter().filter_map(|(px, py)| {
            let psi_at = (h * (px - cx)).atan2(-h * (py - cy));
            let raw = wrap_angle(psi_at - self.psi);
            let turn = if raw.abs() * rho < PATH_TOLERANCE {
                0.0
            } else {
                turn_sign * (turn_sign * raw).rem_euclid(TAU)
            };
            (turn.abs() <= PI + PATH_TOLERANCE).then_some(turn / h)
        });
        nearest_in_sense(paths, sense)
    }
}

/// Smallest path in the requested sense, clamping round-off to zero
fn nearest_in_sense(paths: impl Iterator<Item = f64>, sense: f64) -> Option<f64> {
    paths
        .filter(|s| sense * s >= -PATH_TOLERANCE)
        .map(|s| if sense * s < 0.0 { 0.0 } else { s })
        .min_by(|a, b| {
            (sense * a)
                .partial_cmp(&(sense * b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Transport a state vector from the cylinder `radius` to `target_radius`
///
/// # Returns
/// The transported state vector and the signed transverse path length
pub fn transport(
    params: &DVector<f64>,
    radius: f64,
    target_radius: f64,
    sense: f64,
    bz: f64,
) -> Option<(DVector<f64>, f64)> {
    let phi = params[IDX_PHI];
    let segment = HelixSegment::new(
        Point3::new(radius * phi.cos(), radius * phi.sin(), params[IDX_Z]),
        params[IDX_PSI],
        params[IDX_TAN_LAMBDA],
        -C_LIGHT * bz * params[IDX_Q_OVER_PT],
    );
    let crossing = segment.intersect_cylinder(target_radius, sense)?;
    let transported = DVector::from_vec(vec![
        crossing.position.y.atan2(crossing.position.x),
        crossing.position.z,
        crossing.psi,
        params[IDX_TAN_LAMBDA],
        params[IDX_Q_OVER_PT],
    ]);
    Some((transported, crossing.path_length))
}

/// Numerical Jacobian of [`transport`] by central differences
pub fn transport_jacobian(
    params: &DVector<f64>,
    radius: f64,
    target_radius: f64,
    sense: f64,
    bz: f64,
) -> Option<DMatrix<f64>> {
    let mut jacobian = DMatrix::zeros(STATE_DIM, STATE_DIM);
    for i in 0..STATE_DIM {
        let step = jacobian_step(i, params[i]);
        let mut plus = params.clone();
        plus[i] += step;
        let mut minus = params.clone();
        minus[i] -= step;

        let (forward, _) = transport(&plus, radius, target_radius, sense, bz)?;
        let (backward, _) = transport(&minus, radius, target_radius, sense, bz)?;

        for k in 0..STATE_DIM {
            let mut diff = forward[k] - backward[k];
            if k == IDX_PHI || k == IDX_PSI {
                diff = wrap_angle(diff);
            }
            jacobian[(k, i)] = diff / (2.0 * step);
        }
    }
    Some(jacobian)
}

#[inline]
fn jacobian_step(index: usize, value: f64) -> f64 {
    match index {
        IDX_Q_OVER_PT => JACOBIAN_STEP * value.abs().max(1e-2),
        _ => JACOBIAN_STEP * (1.0 + value.abs()),
    }
}

/// Multiple-scattering model for a homogeneous medium
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringModel {
    /// Radiation length (cm)
    pub radiation_length: f64,
}

impl ScatteringModel {
    /// Create a new model
    pub fn new(radiation_length: f64) -> Self {
        Self { radiation_length }
    }

    /// Process noise accumulated along a transverse path `path_length`
    ///
    /// Uses the Highland formula
    /// `θ0 = 13.6 MeV / p × sqrt(x/X0) × (1 + 0.038 ln(x/X0))`
    /// and spreads `θ0²` onto ψ, tanλ and q/pT.
    pub fn process_noise(&self, params: &DVector<f64>, path_length: f64) -> DMatrix<f64> {
        let mut noise = DMatrix::zeros(STATE_DIM, STATE_DIM);
        let tan_lambda = params[IDX_TAN_LAMBDA];
        let inv_pt = params[IDX_Q_OVER_PT].abs().min(MAX_SCATTERING_INV_PT);
        let sec2 = 1.0 + tan_lambda * tan_lambda;
        let length = path_length.abs() * sec2.sqrt();
        if length <= 0.0 || inv_pt <= 0.0 || !(self.radiation_length > 0.0) {
            return noise;
        }

        let x = length / self.radiation_length;
        let momentum = sec2.sqrt() / inv_pt;
        let theta0 = HIGHLAND_GEV / momentum * x.sqrt() * (1.0 + 0.038 * x.ln()).max(0.0);
        let theta2 = theta0 * theta0;

        noise[(IDX_PSI, IDX_PSI)] = theta2 * sec2;
        noise[(IDX_TAN_LAMBDA, IDX_TAN_LAMBDA)] = theta2 * sec2 * sec2;
        noise[(IDX_Q_OVER_PT, IDX_Q_OVER_PT)] = theta2 * (inv_pt * tan_lambda).powi(2);
        noise
    }
}

/// Predict a state onto a surface
///
/// Implements the helix prediction:
/// - `x' = f(x)` (cylinder crossing in direction `sense`)
/// - `Σ' = J × Σ × Jᵀ + Q`
pub fn predict_state(
    state: &TrackState,
    target: &Surface,
    sense: f64,
    bz: f64,
    scattering: &ScatteringModel,
) -> Result<Projection, TrackingError> {
    let target_radius = target.radius();
    if !(target_radius.is_finite() && target_radius > 0.0) {
        return Err(TrackingError::extrapolation(format!(
            "invalid target radius {}",
            target_radius
        )));
    }

    let (params, path_length) =
        transport(&state.params, state.radius, target_radius, sense, bz).ok_or_else(|| {
            TrackingError::extrapolation(format!(
                "track from r = {:.2} cm does not reach r = {:.2} cm",
                state.radius, target_radius
            ))
        })?;
    let jacobian = transport_jacobian(&state.params, state.radius, target_radius, sense, bz)
        .ok_or_else(|| {
            TrackingError::extrapolation(format!(
                "transport near r = {:.2} cm is not differentiable",
                target_radius
            ))
        })?;

    let covariance = &jacobian * &state.covariance * jacobian.transpose()
        + scattering.process_noise(&params, path_length);
    let predicted = TrackState::new(target_radius, params, symmetrize(&covariance));
    if !predicted.is_finite() {
        return Err(TrackingError::extrapolation("predicted state is not finite"));
    }

    let distance = match target {
        Surface::Radius(_) => 0.0,
        Surface::Point(point) => nalgebra::distance(&predicted.position(), point),
    };

    Ok(Projection {
        state: predicted,
        path_length,
        distance,
    })
}
