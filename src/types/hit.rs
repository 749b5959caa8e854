//! Hit and measurement types
//!
//! A [`Hit`] is a reconstructed TPC cluster position assigned to a detector
//! layer. A [`Measurement`] is the same hit expressed in the local cylinder
//! coordinates consumed by the fit engine.

use nalgebra::{DMatrix, DVector, Point3};
use serde::Serialize;

/// Index of a hit inside the event's hit arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HitId(pub usize);

impl HitId {
    /// Position of the hit in the arena
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A hit assigned to a detector layer
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Arena index
    pub id: HitId,
    /// Global position (cm)
    pub position: Point3<f64>,
    /// Layer index, monotonic with radius
    pub layer: usize,
}

impl Hit {
    /// Create a new hit
    pub fn new(id: HitId, position: Point3<f64>, layer: usize) -> Self {
        Self {
            id,
            position,
            layer,
        }
    }

    /// Transverse radius of the hit
    #[inline]
    pub fn radius(&self) -> f64 {
        self.position.x.hypot(self.position.y)
    }

    /// Azimuth of the hit
    #[inline]
    pub fn phi(&self) -> f64 {
        self.position.y.atan2(self.position.x)
    }
}

/// Half-widths of a lookup window on a layer
///
/// The window is centred on a predicted position and extends `half_rphi`
/// along the arc of the layer and `half_z` along the beam axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchWindow {
    /// Half-width along the arc (cm)
    pub half_rphi: f64,
    /// Half-width along z (cm)
    pub half_z: f64,
}

impl SearchWindow {
    /// Create a new window
    pub fn new(half_rphi: f64, half_z: f64) -> Self {
        Self {
            half_rphi,
            half_z,
        }
    }

    /// Window small enough to match a single known position
    pub fn exact(tolerance: f64) -> Self {
        Self::new(tolerance, tolerance)
    }
}

/// A hit in local cylinder coordinates `[r·φ, z]`
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Originating hit, if the measurement came from the lookup
    pub hit: Option<HitId>,
    /// Layer the measurement belongs to
    pub layer: usize,
    /// Global position (cm)
    pub position: Point3<f64>,
    /// Radius of the measurement surface
    pub radius: f64,
    /// Azimuth of the hit
    pub phi: f64,
    /// Covariance of `[r·φ, z]`
    pub covariance: DMatrix<f64>,
}

impl Measurement {
    /// Measurement dimension
    pub const DIM: usize = 2;

    /// Local coordinate vector `[r·φ, z]`
    pub fn values(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.radius * self.phi, self.position.z])
    }

    /// Longitudinal coordinate
    #[inline]
    pub fn z(&self) -> f64 {
        self.position.z
    }

    /// Attach the originating hit id
    pub fn with_hit(mut self, hit: HitId) -> Self {
        self.hit = Some(hit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_geometry() {
        let hit = Hit::new(HitId(3), Point3::new(0.0, 40.0, 12.0), 7);
        assert!((hit.radius() - 40.0).abs() < 1e-12);
        assert!((hit.phi() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(hit.id.index(), 3);
    }
}
