//! Track state on a cylindrical reference surface
//!
//! The state vector is `[φ, z, ψ, tanλ, q/pT]`:
//!
//! | index | symbol | meaning                                        | unit  |
//! |-------|--------|------------------------------------------------|-------|
//! | 0     | φ      | azimuth of the track point on the cylinder     | rad   |
//! | 1     | z      | longitudinal position                          | cm    |
//! | 2     | ψ      | azimuth of the transverse momentum             | rad   |
//! | 3     | tanλ   | dip slope `dz/ds` along the transverse path    | -     |
//! | 4     | q/pT   | signed inverse transverse momentum             | 1/GeV |
//!
//! ψ always points along the momentum, whichever way the track is followed.

use nalgebra::{DMatrix, DVector, Point3, Vector3};
use serde::Serialize;

use crate::common::constants::C_LIGHT;
use crate::common::linalg::all_finite;

/// Dimension of the helix state vector
pub const STATE_DIM: usize = 5;

/// Index of φ in the state vector
pub const IDX_PHI: usize = 0;
/// Index of z in the state vector
pub const IDX_Z: usize = 1;
/// Index of ψ in the state vector
pub const IDX_PSI: usize = 2;
/// Index of tanλ in the state vector
pub const IDX_TAN_LAMBDA: usize = 3;
/// Index of q/pT in the state vector
pub const IDX_Q_OVER_PT: usize = 4;

/// Direction of a following pass, in terms of layer index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    /// Increasing layer index (along the momentum for tracks from the vertex)
    Outward,
    /// Decreasing layer index (against the momentum)
    Inward,
}

impl Direction {
    /// Sign of the transverse path length travelled in this direction
    #[inline]
    pub fn sense(self) -> f64 {
        match self {
            Direction::Outward => 1.0,
            Direction::Inward => -1.0,
        }
    }

    /// The other direction
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Outward => Direction::Inward,
            Direction::Inward => Direction::Outward,
        }
    }

    /// Layer `steps` away from `layer`, if it exists in a detector of `num_layers`
    pub fn step(self, layer: usize, steps: usize, num_layers: usize) -> Option<usize> {
        match self {
            Direction::Outward => layer.checked_add(steps).filter(|&l| l < num_layers),
            Direction::Inward => layer.checked_sub(steps),
        }
    }
}

/// Target of a state projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    /// Cylinder of fixed radius around the beam axis (a detector layer)
    Radius(f64),
    /// Cylinder through a specific point; the projection also reports the
    /// distance from the projected position to that point
    Point(Point3<f64>),
}

impl Surface {
    /// Radius of the target cylinder
    pub fn radius(&self) -> f64 {
        match self {
            Surface::Radius(r) => *r,
            Surface::Point(p) => p.x.hypot(p.y),
        }
    }
}

/// Helix state estimate with covariance on a cylinder of radius `radius`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    /// Radius of the reference cylinder (cm)
    pub radius: f64,
    /// State vector `[φ, z, ψ, tanλ, q/pT]`
    pub params: DVector<f64>,
    /// State covariance
    pub covariance: DMatrix<f64>,
}

impl TrackState {
    /// Create a new state
    pub fn new(radius: f64, params: DVector<f64>, covariance: DMatrix<f64>) -> Self {
        Self {
            radius,
            params,
            covariance,
        }
    }

    /// Create a state from individual parameters
    pub fn from_parameters(
        radius: f64,
        phi: f64,
        z: f64,
        psi: f64,
        tan_lambda: f64,
        q_over_pt: f64,
        covariance: DMatrix<f64>,
    ) -> Self {
        Self::new(
            radius,
            DVector::from_vec(vec![phi, z, psi, tan_lambda, q_over_pt]),
            covariance,
        )
    }

    /// Azimuth of the track point
    #[inline]
    pub fn phi(&self) -> f64 {
        self.params[IDX_PHI]
    }

    /// Longitudinal position
    #[inline]
    pub fn z(&self) -> f64 {
        self.params[IDX_Z]
    }

    /// Azimuth of the transverse momentum
    #[inline]
    pub fn psi(&self) -> f64 {
        self.params[IDX_PSI]
    }

    /// Dip slope
    #[inline]
    pub fn tan_lambda(&self) -> f64 {
        self.params[IDX_TAN_LAMBDA]
    }

    /// Signed inverse transverse momentum (1/GeV)
    #[inline]
    pub fn q_over_pt(&self) -> f64 {
        self.params[IDX_Q_OVER_PT]
    }

    /// Global position of the state
    pub fn position(&self) -> Point3<f64> {
        let phi = self.phi();
        Point3::new(self.radius * phi.cos(), self.radius * phi.sin(), self.z())
    }

    /// Charge sign, `0` for a straight (infinite momentum) state
    pub fn charge(&self) -> i8 {
        let q = self.q_over_pt();
        if q > 0.0 {
            1
        } else if q < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Transverse momentum (GeV), `None` for a straight state
    pub fn pt(&self) -> Option<f64> {
        let q = self.q_over_pt();
        (q != 0.0).then(|| 1.0 / q.abs())
    }

    /// Momentum vector (GeV), `None` for a straight state
    pub fn momentum(&self) -> Option<Vector3<f64>> {
        let pt = self.pt()?;
        let psi = self.psi();
        Some(Vector3::new(
            pt * psi.cos(),
            pt * psi.sin(),
            pt * self.tan_lambda(),
        ))
    }

    /// Signed transverse curvature (1/cm) in a field `bz` (T)
    ///
    /// Positive curvature turns the momentum counter-clockwise.
    #[inline]
    pub fn transverse_curvature(&self, bz: f64) -> f64 {
        -C_LIGHT * bz * self.q_over_pt()
    }

    /// Standard deviation of one state parameter
    pub fn sigma(&self, index: usize) -> f64 {
        self.covariance[(index, index)].max(0.0).sqrt()
    }

    /// True if the mean and covariance contain only finite values
    pub fn is_finite(&self) -> bool {
        self.radius.is_finite()
            && all_finite(&self.params)
            && self.covariance.iter().all(|x| x.is_finite())
    }
}

/// Result of projecting a state onto a [`Surface`]
#[derive(Debug, Clone)]
pub struct Projection {
    /// Predicted state on the target cylinder
    pub state: TrackState,
    /// Signed transverse path length travelled (cm)
    pub path_length: f64,
    /// Distance from the predicted position to the target point
    /// (zero for [`Surface::Radius`] targets)
    pub distance: f64,
}
