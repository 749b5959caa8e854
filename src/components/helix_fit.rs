//! Helix estimation from space points
//!
//! Two circle estimators are provided for seeding:
//!
//! - [`circle_through`] - exact circle through three points (fast seeding)
//! - [`fit_circle`] - algebraic least-squares circle over all points
//!   (`x² + y² + D·x + E·y + F = 0`), used by the precise seed and the refit
//!
//! The dip is then fitted as a straight line of `z` against the transverse
//! arc length along the circle. Points are expected ordered by increasing
//! radius; the momentum is taken to point from the first to the last point.

use nalgebra::{DMatrix, DVector, Point3};

use crate::common::constants::{C_LIGHT, COINCIDENCE_TOLERANCE, COLLINEARITY_TOLERANCE};
use crate::common::linalg::wrap_angle;
use crate::follower::errors::TrackingError;
use crate::types::STATE_DIM;

/// Minimum |Bz| (T) for converting curvature to momentum
const MIN_FIELD_TESLA: f64 = 1e-9;

/// Circle estimator used to seed a helix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircleMethod {
    /// Exact circle through the innermost, middle and outermost point
    ThreePoint,
    /// Least-squares circle through all points
    LeastSquares,
}

/// Circle in the transverse plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Centre x (cm)
    pub cx: f64,
    /// Centre y (cm)
    pub cy: f64,
    /// Radius (cm)
    pub radius: f64,
}

/// Check that points can define a track
///
/// Requires at least three finite points with no two coincident.
pub fn validate_points(points: &[Point3<f64>]) -> Result<(), TrackingError> {
    if points.len() < 3 {
        return Err(TrackingError::degenerate(format!(
            "{} points, at least 3 required",
            points.len()
        )));
    }
    if points.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
        return Err(TrackingError::NonFiniteHit);
    }
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            if nalgebra::distance(a, b) < COINCIDENCE_TOLERANCE {
                return Err(TrackingError::degenerate("coincident points"));
            }
        }
    }
    Ok(())
}

/// True if every point lies on the transverse line through the first and last
pub fn is_collinear(points: &[Point3<f64>]) -> bool {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return true;
    };
    let (ux, uy) = (last.x - first.x, last.y - first.y);
    let chord = ux.hypot(uy);
    points.iter().all(|p| {
        let (vx, vy) = (p.x - first.x, p.y - first.y);
        let cross = ux * vy - uy * vx;
        cross.abs() <= COLLINEARITY_TOLERANCE * chord * vx.hypot(vy)
    })
}

/// Circle through three points, `None` if they are collinear
pub fn circle_through(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Circle> {
    if is_collinear(&[*a, *b, *c]) {
        return None;
    }
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    let (a2, b2, c2) = (
        a.x * a.x + a.y * a.y,
        b.x * b.x + b.y * b.y,
        c.x * c.x + c.y * c.y,
    );
    let cx = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let cy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let radius = (a.x - cx).hypot(a.y - cy);
    (cx.is_finite() && cy.is_finite() && radius.is_finite()).then_some(Circle { cx, cy, radius })
}

/// Algebraic least-squares circle through all points
///
/// Coordinates are centred on the point mean before solving the normal
/// equations.
pub fn fit_circle(points: &[Point3<f64>]) -> Option<Circle> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;

    let mut a = DMatrix::zeros(points.len(), 3);
    let mut b = DVector::zeros(points.len());
    for (i, p) in points.iter().enumerate() {
        let (x, y) = (p.x - mx, p.y - my);
        a[(i, 0)] = x;
        a[(i, 1)] = y;
        a[(i, 2)] = 1.0;
        b[i] = -(x * x + y * y);
    }
    let normal = a.transpose() * &a;
    let rhs = a.transpose() * b;
    let solution = normal.lu().solve(&rhs)?;

    let (cx, cy) = (-0.5 * solution[0], -0.5 * solution[1]);
    let r2 = cx * cx + cy * cy - solution[2];
    if !(r2 > 0.0) || !cx.is_finite() || !cy.is_finite() {
        return None;
    }
    Some(Circle {
        cx: cx + mx,
        cy: cy + my,
        radius: r2.sqrt(),
    })
}

/// Helix parameters estimated from a set of points
#[derive(Debug, Clone, PartialEq)]
pub struct HelixEstimate {
    /// Signed transverse curvature (1/cm), zero for a straight line
    pub curvature: f64,
    /// Dip slope
    pub tan_lambda: f64,
    center: Option<(f64, f64)>,
    line_psi: f64,
}

impl HelixEstimate {
    /// Momentum azimuth at a point on the helix
    pub fn psi_at(&self, point: &Point3<f64>) -> f64 {
        match self.center {
            Some((cx, cy)) => {
                let h = self.curvature;
                (h * (point.x - cx)).atan2(-h * (point.y - cy))
            }
            None => self.line_psi,
        }
    }

    /// State vector at `point` in a field `bz`
    ///
    /// # Returns
    /// The cylinder radius of the point and `[φ, z, ψ, tanλ, q/pT]`
    pub fn state_params(
        &self,
        point: &Point3<f64>,
        bz: f64,
    ) -> Result<(f64, DVector<f64>), TrackingError> {
        let radius = point.x.hypot(point.y);
        if !(radius > COINCIDENCE_TOLERANCE) {
            return Err(TrackingError::degenerate("start point on the beam axis"));
        }
        let q_over_pt = if self.curvature == 0.0 {
            0.0
        } else if bz.abs() < MIN_FIELD_TESLA {
            return Err(TrackingError::degenerate(
                "curved seed without a longitudinal field",
            ));
        } else {
            -self.curvature / (C_LIGHT * bz)
        };

        let mut params = DVector::zeros(STATE_DIM);
        params[0] = point.y.atan2(point.x);
        params[1] = point.z;
        params[2] = self.psi_at(point);
        params[3] = self.tan_lambda;
        params[4] = q_over_pt;
        Ok((radius, params))
    }
}

/// Estimate a helix from points ordered by increasing radius
///
/// Collinear points are rejected unless `allow_straight` is set, in which case
/// they give a straight-line estimate with zero curvature.
pub fn estimate_helix(
    points: &[Point3<f64>],
    method: CircleMethod,
    allow_straight: bool,
) -> Result<HelixEstimate, TrackingError> {
    validate_points(points)?;
    let first = points[0];
    let last = points[points.len() - 1];

    if is_collinear(points) {
        if !allow_straight {
            return Err(TrackingError::degenerate("collinear points"));
        }
        let line_psi = (last.y - first.y).atan2(last.x - first.x);
        let (ux, uy) = (line_psi.cos(), line_psi.sin());
        let arcs: Vec<f64> = points
            .iter()
            .map(|p| (p.x - first.x) * ux + (p.y - first.y) * uy)
            .collect();
        return Ok(HelixEstimate {
            curvature: 0.0,
            tan_lambda: fit_slope(&arcs, points)?,
            center: None,
            line_psi,
        });
    }

    let middle = points[points.len() / 2];
    let circle = match method {
        CircleMethod::ThreePoint => circle_through(&first, &middle, &last),
        CircleMethod::LeastSquares => fit_circle(points),
    }
    .ok_or_else(|| TrackingError::degenerate("no circle through the points"))?;

    // Counter-clockwise travel from first to last gives positive curvature
    let turn =
        (middle.x - first.x) * (last.y - middle.y) - (middle.y - first.y) * (last.x - middle.x);
    let curvature = turn.signum() / circle.radius;

    let estimate = HelixEstimate {
        curvature,
        tan_lambda: 0.0,
        center: Some((circle.cx, circle.cy)),
        line_psi: 0.0,
    };

    // Unwrapped arc length of each point from the first
    let mut arcs = Vec::with_capacity(points.len());
    let mut turned = 0.0;
    let mut previous = estimate.psi_at(&first);
    for p in points {
        let psi = estimate.psi_at(p);
        turned += wrap_angle(psi - previous);
        previous = psi;
        arcs.push(turned / curvature);
    }

    Ok(HelixEstimate {
        tan_lambda: fit_slope(&arcs, points)?,
        ..estimate
    })
}

/// Least-squares slope of z against arc length
fn fit_slope(arcs: &[f64], points: &[Point3<f64>]) -> Result<f64, TrackingError> {
    let n = arcs.len() as f64;
    let mean_s = arcs.iter().sum::<f64>() / n;
    let mean_z = points.iter().map(|p| p.z).sum::<f64>() / n;
    let (mut sxx, mut sxz) = (0.0, 0.0);
    for (s, p) in arcs.iter().zip(points) {
        sxx += (s - mean_s).powi(2);
        sxz += (s - mean_s) * (p.z - mean_z);
    }
    if !(sxx > COINCIDENCE_TOLERANCE * COINCIDENCE_TOLERANCE) {
        return Err(TrackingError::degenerate("points share one transverse position"));
    }
    Ok(sxz / sxx)
}
