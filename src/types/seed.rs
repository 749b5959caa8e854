//! Track seeds produced by an external seed finder

use nalgebra::Point3;
use smallvec::SmallVec;

/// Seed points are almost always triplets or short stubs
pub type SeedPoints = SmallVec<[Point3<f64>; 4]>;

/// A short, helix-consistent group of hits used to start track following
///
/// Seeds are immutable once built. The follower reads them and never keeps
/// references after a call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    points: SeedPoints,
    charge: i8,
    curvature: f64,
}

impl Seed {
    /// Create a new seed
    ///
    /// # Arguments
    /// * `points` - Hit positions in any order
    /// * `charge` - Inferred charge sign (`+1` or `-1`, `0` if unknown)
    /// * `curvature` - Approximate transverse curvature (1/cm) from the seed finder
    pub fn new(points: impl IntoIterator<Item = Point3<f64>>, charge: i8, curvature: f64) -> Self {
        Self {
            points: points.into_iter().collect(),
            charge: charge.signum(),
            curvature,
        }
    }

    /// Seed with unknown charge and curvature
    pub fn from_points(points: impl IntoIterator<Item = Point3<f64>>) -> Self {
        Self::new(points, 0, 0.0)
    }

    /// Seed points as supplied
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Inferred charge sign
    #[inline]
    pub fn charge(&self) -> i8 {
        self.charge
    }

    /// Approximate curvature from the seed finder
    #[inline]
    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the seed has no points
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points ordered by increasing transverse radius
    ///
    /// Tracks come from the interaction region, so this is also the direction
    /// of motion.
    pub fn ordered_by_radius(&self) -> SeedPoints {
        let mut ordered = self.points.clone();
        ordered.sort_by(|a, b| {
            a.x.hypot(a.y)
                .partial_cmp(&b.x.hypot(b.y))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_by_radius() {
        let seed = Seed::new(
            vec![
                Point3::new(50.0, 0.0, 0.0),
                Point3::new(30.0, 0.0, 0.0),
                Point3::new(40.0, 0.0, 0.0),
            ],
            -3,
            0.01,
        );
        let ordered = seed.ordered_by_radius();
        assert_eq!(ordered[0].x, 30.0);
        assert_eq!(ordered[2].x, 50.0);
        assert_eq!(seed.charge(), -1);
        assert_eq!(seed.len(), 3);
    }
}
