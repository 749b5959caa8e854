//! Configuration types for track following
//!
//! This module provides focused, purpose-specific configs: detector geometry,
//! the hit resolution model, the fit engine tunables and the follower's
//! run-level switches. All of them serialize to JSON through
//! [`ConfigSnapshot`] for run bookkeeping.

use serde::Serialize;

use crate::common::constants::{CHI2_2DOF_999, DEFAULT_GAS_RADIATION_LENGTH_CM};
use crate::follower::errors::TrackingError;

/// Layer assignment tolerance (cm) for a detector with a single layer
const SINGLE_LAYER_TOLERANCE: f64 = 1.0;

/// Concentric cylindrical layers of the drift chamber
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorGeometry {
    /// Layer radii in cm, strictly increasing
    layer_radii: Vec<f64>,
    /// Half-length of the sensitive volume along z (cm)
    half_length: f64,
}

impl DetectorGeometry {
    /// Create a geometry from explicit layer radii
    ///
    /// # Errors
    /// `MissingGeometry` for an empty layer list, `Configuration` for radii that
    /// are not positive, finite and strictly increasing, or a non-positive
    /// half-length.
    pub fn new(layer_radii: Vec<f64>, half_length: f64) -> Result<Self, TrackingError> {
        if layer_radii.is_empty() {
            return Err(TrackingError::MissingGeometry);
        }
        if !(half_length.is_finite() && half_length > 0.0) {
            return Err(TrackingError::Configuration {
                description: format!("half length must be positive, got {}", half_length),
            });
        }
        let valid = layer_radii.iter().all(|r| r.is_finite() && *r > 0.0)
            && layer_radii.windows(2).all(|w| w[1] > w[0]);
        if !valid {
            return Err(TrackingError::Configuration {
                description: "layer radii must be positive and strictly increasing".to_string(),
            });
        }
        Ok(Self {
            layer_radii,
            half_length,
        })
    }

    /// Evenly spaced layers between `inner` and `outer` (inclusive)
    pub fn uniform(
        num_layers: usize,
        inner: f64,
        outer: f64,
        half_length: f64,
    ) -> Result<Self, TrackingError> {
        let radii = match num_layers {
            0 => Vec::new(),
            1 => vec![inner],
            n => {
                let step = (outer - inner) / (n - 1) as f64;
                (0..n).map(|i| inner + step * i as f64).collect()
            }
        };
        Self::new(radii, half_length)
    }

    /// 48-layer TPC between 30 and 77 cm with a 105.5 cm half-length
    pub fn sphenix_tpc() -> Self {
        let layer_radii = (0..48).map(|i| 30.0 + i as f64).collect();
        Self {
            layer_radii,
            half_length: 105.5,
        }
    }

    /// Number of layers
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layer_radii.len()
    }

    /// True if there are no layers
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layer_radii.is_empty()
    }

    /// Radius of a layer
    #[inline]
    pub fn radius(&self, layer: usize) -> Option<f64> {
        self.layer_radii.get(layer).copied()
    }

    /// All layer radii
    #[inline]
    pub fn radii(&self) -> &[f64] {
        &self.layer_radii
    }

    /// Half-length of the sensitive volume
    #[inline]
    pub fn half_length(&self) -> f64 {
        self.half_length
    }

    /// True if `z` lies inside the sensitive volume
    #[inline]
    pub fn contains_z(&self, z: f64) -> bool {
        z.abs() <= self.half_length
    }

    /// Layer whose radius is closest to `radius`
    ///
    /// Returns `None` if the radius is further than half a layer spacing from
    /// every layer.
    pub fn layer_of(&self, radius: f64) -> Option<usize> {
        if !radius.is_finite() || self.layer_radii.is_empty() {
            return None;
        }
        let upper = self.layer_radii.partition_point(|&r| r < radius);
        let nearest = match upper {
            0 => 0,
            n if n == self.layer_radii.len() => n - 1,
            n => {
                if radius - self.layer_radii[n - 1] <= self.layer_radii[n] - radius {
                    n - 1
                } else {
                    n
                }
            }
        };
        let tolerance = self.layer_tolerance(nearest)?;
        ((radius - self.layer_radii[nearest]).abs() <= tolerance).then_some(nearest)
    }

    /// Radial acceptance of `layer`: half the distance to the closest
    /// neighbouring layer
    pub fn layer_tolerance(&self, layer: usize) -> Option<f64> {
        let r = *self.layer_radii.get(layer)?;
        let below = layer
            .checked_sub(1)
            .map(|l| r - self.layer_radii[l])
            .unwrap_or(f64::INFINITY);
        let above = self
            .layer_radii
            .get(layer + 1)
            .map(|&next| next - r)
            .unwrap_or(f64::INFINITY);
        let gap = below.min(above);
        Some(if gap.is_finite() {
            0.5 * gap
        } else {
            SINGLE_LAYER_TOLERANCE
        })
    }
}

/// Measurement resolution of one layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerResolution {
    /// Resolution along the arc (cm)
    pub rphi: f64,
    /// Resolution along z (cm)
    pub z: f64,
}

impl LayerResolution {
    /// Create a new resolution
    pub fn new(rphi: f64, z: f64) -> Self {
        Self { rphi, z }
    }
}

/// Per-layer hit resolution with a detector-wide default
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionModel {
    /// Resolution for layers without an override
    pub default: LayerResolution,
    /// Per-layer overrides, indexed by layer
    pub per_layer: Vec<Option<LayerResolution>>,
}

impl Default for ResolutionModel {
    fn default() -> Self {
        Self {
            default: LayerResolution::new(0.02, 0.08),
            per_layer: Vec::new(),
        }
    }
}

impl ResolutionModel {
    /// Uniform resolution for every layer
    pub fn uniform(rphi: f64, z: f64) -> Self {
        Self {
            default: LayerResolution::new(rphi, z),
            per_layer: Vec::new(),
        }
    }

    /// Override the resolution of one layer
    pub fn with_layer(mut self, layer: usize, resolution: LayerResolution) -> Self {
        if self.per_layer.len() <= layer {
            self.per_layer.resize(layer + 1, None);
        }
        self.per_layer[layer] = Some(resolution);
        self
    }

    /// Resolution of `layer`
    pub fn for_layer(&self, layer: usize) -> LayerResolution {
        self.per_layer
            .get(layer)
            .copied()
            .flatten()
            .unwrap_or(self.default)
    }

    fn validate(&self) -> Result<(), TrackingError> {
        let ok = |r: &LayerResolution| {
            r.rphi > 0.0 && r.z > 0.0 && r.rphi.is_finite() && r.z.is_finite()
        };
        if ok(&self.default) && self.per_layer.iter().flatten().all(ok) {
            Ok(())
        } else {
            Err(TrackingError::Configuration {
                description: "hit resolutions must be positive and finite".to_string(),
            })
        }
    }
}

/// Which seed hit the initial state is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartPoint {
    /// Outermost seed hit
    Outermost,
    /// Innermost seed hit
    Innermost,
}

/// Whether a hit accepted into one track stays available to others
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HitSharing {
    /// Hits may be used by any number of tracks; seeds are independent
    Shared,
    /// A hit accepted into a finished track is withheld from later seeds;
    /// seeds are followed sequentially in input order
    Exclusive,
}

/// Tunables of the helix Kalman fit engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitterConfig {
    /// Radiation length of the traversed medium (cm), drives multiple scattering
    pub radiation_length: f64,
    /// Initial σ of φ (rad)
    pub initial_sigma_phi: f64,
    /// Initial σ of z (cm)
    pub initial_sigma_z: f64,
    /// Initial σ of ψ (rad)
    pub initial_sigma_psi: f64,
    /// Initial σ of tanλ
    pub initial_sigma_tan_lambda: f64,
    /// Initial relative σ of q/pT
    pub initial_relative_sigma_q_over_pt: f64,
    /// Floor of the initial σ of q/pT (1/GeV)
    pub initial_min_sigma_q_over_pt: f64,
    /// Covariance inflation applied before each filter pass starts
    pub inflation: f64,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            radiation_length: DEFAULT_GAS_RADIATION_LENGTH_CM,
            initial_sigma_phi: 1e-3,
            initial_sigma_z: 0.1,
            initial_sigma_psi: 5e-3,
            initial_sigma_tan_lambda: 5e-3,
            initial_relative_sigma_q_over_pt: 0.1,
            initial_min_sigma_q_over_pt: 0.01,
            inflation: 100.0,
        }
    }
}

impl FitterConfig {
    /// Set the radiation length
    pub fn with_radiation_length(mut self, radiation_length: f64) -> Self {
        self.radiation_length = radiation_length;
        self
    }

    /// Set the covariance inflation factor
    pub fn with_inflation(mut self, inflation: f64) -> Self {
        self.inflation = inflation;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TrackingError> {
        let sigmas = [
            self.initial_sigma_phi,
            self.initial_sigma_z,
            self.initial_sigma_psi,
            self.initial_sigma_tan_lambda,
            self.initial_relative_sigma_q_over_pt,
            self.initial_min_sigma_q_over_pt,
        ];
        if !(self.radiation_length > 0.0) {
            return Err(TrackingError::Configuration {
                description: format!(
                    "radiation length must be positive, got {}",
                    self.radiation_length
                ),
            });
        }
        if sigmas.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(TrackingError::Configuration {
                description: "initial uncertainties must be positive and finite".to_string(),
            });
        }
        if !(self.inflation >= 1.0) {
            return Err(TrackingError::Configuration {
                description: format!("inflation must be at least 1, got {}", self.inflation),
            });
        }
        Ok(())
    }
}

/// Configuration of the track follower
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowerConfig {
    /// Seed from an analytic three-point helix (`true`) or from a fit-engine
    /// pass over all seed points (`false`)
    pub optimization_helix: bool,
    /// Refit every accepted track over its full hit list
    pub optimization_precise_fit: bool,
    /// Seed hit the initial state is placed on
    pub start_point: StartPoint,
    /// Hit sharing policy between tracks
    pub hit_sharing: HitSharing,
    /// Consecutive layers without a compatible hit tolerated before a pass ends
    pub max_missed_layers: usize,
    /// Chi-square gate for accepting a hit (2 degrees of freedom)
    pub chi2_cut: f64,
    /// Window half-width in predicted standard deviations
    pub window_sigmas: f64,
    /// Lower clamp of the arc half-width (cm)
    pub min_window_rphi: f64,
    /// Upper clamp of the arc half-width (cm)
    pub max_window_rphi: f64,
    /// Lower clamp of the z half-width (cm)
    pub min_window_z: f64,
    /// Upper clamp of the z half-width (cm)
    pub max_window_z: f64,
    /// Minimum number of accepted measurements for a track to be kept
    pub min_hits: usize,
    /// Accept collinear seeds as straight tracks instead of rejecting them
    pub allow_straight_seeds: bool,
    /// Worker threads for the seed loop, `0` for the rayon default
    pub num_threads: usize,
    /// Hit resolution model used to build measurements
    pub resolution: ResolutionModel,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            optimization_helix: true,
            optimization_precise_fit: false,
            start_point: StartPoint::Outermost,
            hit_sharing: HitSharing::Shared,
            max_missed_layers: 2,
            chi2_cut: CHI2_2DOF_999,
            window_sigmas: 5.0,
            min_window_rphi: 0.1,
            max_window_rphi: 5.0,
            min_window_z: 0.2,
            max_window_z: 10.0,
            min_hits: 5,
            allow_straight_seeds: false,
            num_threads: 0,
            resolution: ResolutionModel::default(),
        }
    }
}

impl FollowerConfig {
    /// Set the helix seeding switch
    pub fn with_optimization_helix(mut self, opt: bool) -> Self {
        self.optimization_helix = opt;
        self
    }

    /// Set the precise refit switch
    pub fn with_optimization_precise_fit(mut self, opt: bool) -> Self {
        self.optimization_precise_fit = opt;
        self
    }

    /// Set the start point
    pub fn with_start_point(mut self, start_point: StartPoint) -> Self {
        self.start_point = start_point;
        self
    }

    /// Set the hit sharing policy
    pub fn with_hit_sharing(mut self, hit_sharing: HitSharing) -> Self {
        self.hit_sharing = hit_sharing;
        self
    }

    /// Set the gap tolerance
    pub fn with_max_missed_layers(mut self, max_missed_layers: usize) -> Self {
        self.max_missed_layers = max_missed_layers;
        self
    }

    /// Set the chi-square gate
    pub fn with_chi2_cut(mut self, chi2_cut: f64) -> Self {
        self.chi2_cut = chi2_cut;
        self
    }

    /// Set the minimum number of hits
    pub fn with_min_hits(mut self, min_hits: usize) -> Self {
        self.min_hits = min_hits;
        self
    }

    /// Allow straight-line seeds
    pub fn with_allow_straight_seeds(mut self, allow: bool) -> Self {
        self.allow_straight_seeds = allow;
        self
    }

    /// Set the number of worker threads
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set the resolution model
    pub fn with_resolution(mut self, resolution: ResolutionModel) -> Self {
        self.resolution = resolution;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TrackingError> {
        if !(self.chi2_cut > 0.0) {
            return Err(TrackingError::Configuration {
                description: format!("chi2 cut must be positive, got {}", self.chi2_cut),
            });
        }
        if !(self.window_sigmas > 0.0) {
            return Err(TrackingError::Configuration {
                description: format!("window sigmas must be positive, got {}", self.window_sigmas),
            });
        }
        if !(self.min_window_rphi > 0.0 && self.min_window_rphi <= self.max_window_rphi)
            || !(self.min_window_z > 0.0 && self.min_window_z <= self.max_window_z)
        {
            return Err(TrackingError::Configuration {
                description: "window clamps must satisfy 0 < min <= max".to_string(),
            });
        }
        self.resolution.validate()
    }
}

/// Complete configuration snapshot for run bookkeeping
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    /// Follower configuration
    pub follower: FollowerConfig,
    /// Fit engine configuration
    pub fitter: FitterConfig,
    /// Detector geometry
    pub geometry: DetectorGeometry,
}

impl ConfigSnapshot {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Serialize to pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_layer_of() {
        let geometry = DetectorGeometry::uniform(5, 30.0, 34.0, 100.0).unwrap();
        assert_eq!(geometry.num_layers(), 5);
        assert_eq!(geometry.layer_of(30.0), Some(0));
        assert_eq!(geometry.layer_of(31.4), Some(1));
        assert_eq!(geometry.layer_of(31.6), Some(2));
        assert_eq!(geometry.layer_of(34.4), Some(4));
        assert_eq!(geometry.layer_of(35.0), None);
        assert_eq!(geometry.layer_of(10.0), None);
    }

    #[test]
    fn test_geometry_validation() {
        assert!(matches!(
            DetectorGeometry::new(vec![], 100.0),
            Err(TrackingError::MissingGeometry)
        ));
        assert!(DetectorGeometry::new(vec![30.0, 29.0], 100.0).is_err());
        assert!(DetectorGeometry::new(vec![30.0, 31.0], 0.0).is_err());
        let tpc = DetectorGeometry::sphenix_tpc();
        assert_eq!(tpc.num_layers(), 48);
        assert!(tpc.contains_z(-105.0));
        assert!(!tpc.contains_z(106.0));
    }

    #[test]
    fn test_resolution_overrides() {
        let model =
            ResolutionModel::uniform(0.02, 0.1).with_layer(3, LayerResolution::new(0.05, 0.2));
        assert_eq!(model.for_layer(0), LayerResolution::new(0.02, 0.1));
        assert_eq!(model.for_layer(3), LayerResolution::new(0.05, 0.2));
        assert_eq!(model.for_layer(40), LayerResolution::new(0.02, 0.1));
    }

    #[test]
    fn test_follower_config_validation() {
        assert!(FollowerConfig::default().validate().is_ok());
        assert!(FollowerConfig::default().with_chi2_cut(0.0).validate().is_err());
        assert!(FitterConfig::default().validate().is_ok());
        assert!(FitterConfig::default().with_inflation(0.5).validate().is_err());
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = ConfigSnapshot {
            follower: FollowerConfig::default(),
            fitter: FitterConfig::default(),
            geometry: DetectorGeometry::sphenix_tpc(),
        };
        let json = snapshot.to_json();
        assert!(json.contains("optimization_helix"));
        assert!(json.contains("Outermost"));
        assert!(json.contains("half_length"));
    }
}
