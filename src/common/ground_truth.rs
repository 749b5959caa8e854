//! Synthetic event generation
//!
//! Functions to simulate helical tracks from the interaction region and the
//! TPC hits they leave, for tests, benchmarks and demos.

use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::common::constants::{C_LIGHT, DEFAULT_BZ_TESLA};
use crate::components::prediction::HelixSegment;
use crate::follower::errors::TrackingError;
use crate::types::{DetectorGeometry, HitId, LayerResolution, Seed};

/// Parameters of a synthetic event
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthConfig {
    /// Number of generated tracks
    pub num_tracks: usize,
    /// Transverse momentum range (GeV)
    pub pt_range: (f64, f64),
    /// Dip slope range
    pub tan_lambda_range: (f64, f64),
    /// Spread of the vertex along z (cm), zero for a point vertex
    pub vertex_z_sigma: f64,
    /// Gaussian hit smearing, `None` for noiseless hits
    pub smearing: Option<LayerResolution>,
    /// Layers whose hits form each track's seed
    pub seed_layers: [usize; 3],
    /// Longitudinal field (T)
    pub bz: f64,
}

impl Default for GroundTruthConfig {
    fn default() -> Self {
        Self {
            num_tracks: 50,
            pt_range: (0.5, 5.0),
            tan_lambda_range: (-0.8, 0.8),
            vertex_z_sigma: 2.0,
            smearing: None,
            seed_layers: [20, 22, 24],
            bz: DEFAULT_BZ_TESLA,
        }
    }
}

impl GroundTruthConfig {
    /// Set the number of tracks
    pub fn with_num_tracks(mut self, num_tracks: usize) -> Self {
        self.num_tracks = num_tracks;
        self
    }

    /// Set the hit smearing
    pub fn with_smearing(mut self, smearing: LayerResolution) -> Self {
        self.smearing = Some(smearing);
        self
    }

    /// Set the seed layers
    pub fn with_seed_layers(mut self, seed_layers: [usize; 3]) -> Self {
        self.seed_layers = seed_layers;
        self
    }
}

/// A generated particle and the hits it left
#[derive(Debug, Clone)]
pub struct TrueTrack {
    /// Charge sign
    pub charge: i8,
    /// Transverse momentum (GeV)
    pub pt: f64,
    /// Initial momentum azimuth
    pub phi0: f64,
    /// Dip slope
    pub tan_lambda: f64,
    /// Production vertex
    pub vertex: Point3<f64>,
    /// `(layer, hit)` pairs in increasing layer order
    pub hits: Vec<(usize, HitId)>,
}

impl TrueTrack {
    /// Signed transverse curvature in a field `bz`
    pub fn curvature(&self, bz: f64) -> f64 {
        -C_LIGHT * bz * f64::from(self.charge) / self.pt
    }

    /// Hit on `layer`, if the track left one
    pub fn hit_on(&self, layer: usize) -> Option<HitId> {
        self.hits.iter().find(|(l, _)| *l == layer).map(|(_, id)| *id)
    }
}

/// Hits, truth and seeds of one generated event
#[derive(Debug, Clone)]
pub struct SyntheticEvent {
    /// Hit positions; a position's index is its [`HitId`]
    pub hits: Vec<Point3<f64>>,
    /// Generated particles
    pub truth: Vec<TrueTrack>,
    /// One seed per particle that crossed every seed layer, in truth order
    pub seeds: Vec<Seed>,
    /// Truth index of each seed
    pub seed_truth: Vec<usize>,
}

impl SyntheticEvent {
    /// Remove the hit a track left on `layer`, renumbering later hits
    ///
    /// Returns the removed position.
    pub fn remove_hit(&mut self, track: usize, layer: usize) -> Option<Point3<f64>> {
        let id = self.truth.get(track)?.hit_on(layer)?;
        let removed = self.hits.remove(id.index());
        for truth in &mut self.truth {
            truth.hits.retain(|(_, h)| *h != id);
            for (_, h) in &mut truth.hits {
                if h.index() > id.index() {
                    *h = HitId(h.index() - 1);
                }
            }
        }
        Some(removed)
    }
}

/// Generate a synthetic event
///
/// Tracks start at the origin (smeared along z), with random charge sign,
/// uniformly drawn pT, azimuth and tanλ. Each leaves one hit per layer it
/// crosses until it curls back or leaves the sensitive volume.
///
/// # Errors
/// `Configuration` if a seed layer does not exist or the ranges are invalid.
pub fn generate_event(
    geometry: &DetectorGeometry,
    config: &GroundTruthConfig,
    seed: u64,
) -> Result<SyntheticEvent, TrackingError> {
    if config.seed_layers.iter().any(|&l| l >= geometry.num_layers()) {
        return Err(TrackingError::Configuration {
            description: format!(
                "seed layers {:?} outside a {}-layer detector",
                config.seed_layers,
                geometry.num_layers()
            ),
        });
    }
    let (pt_lo, pt_hi) = config.pt_range;
    let (tl_lo, tl_hi) = config.tan_lambda_range;
    if !(pt_lo > 0.0 && pt_lo <= pt_hi && tl_lo <= tl_hi) {
        return Err(TrackingError::Configuration {
            description: "invalid momentum or dip range".to_string(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let vertex_z = Normal::new(0.0, config.vertex_z_sigma.max(0.0)).map_err(|err| {
        TrackingError::Configuration {
            description: format!("vertex spread: {}", err),
        }
    })?;
    let smear = match config.smearing {
        Some(res) => Some((
            Normal::new(0.0, res.rphi).map_err(|err| TrackingError::Configuration {
                description: format!("r-phi smearing: {}", err),
            })?,
            Normal::new(0.0, res.z).map_err(|err| TrackingError::Configuration {
                description: format!("z smearing: {}", err),
            })?,
        )),
        None => None,
    };

    let mut event = SyntheticEvent {
        hits: Vec::new(),
        truth: Vec::with_capacity(config.num_tracks),
        seeds: Vec::new(),
        seed_truth: Vec::new(),
    };

    for _ in 0..config.num_tracks {
        let charge: i8 = if rng.gen_bool(0.5) { 1 } else { -1 };
        let mut track = TrueTrack {
            charge,
            pt: rng.gen_range(pt_lo..=pt_hi),
            phi0: rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
            tan_lambda: rng.gen_range(tl_lo..=tl_hi),
            vertex: Point3::new(0.0, 0.0, vertex_z.sample(&mut rng)),
            hits: Vec::new(),
        };
        let segment = HelixSegment::new(
            track.vertex,
            track.phi0,
            track.tan_lambda,
            track.curvature(config.bz),
        );

        for (layer, &radius) in geometry.radii().iter().enumerate() {
            let Some(crossing) = segment.intersect_cylinder(radius, 1.0) else {
                break;
            };
            let mut position = crossing.position;
            if !geometry.contains_z(position.z) {
                break;
            }
            if let Some((rphi, z)) = &smear {
                let phi = position.y.atan2(position.x) + rphi.sample(&mut rng) / radius;
                position = Point3::new(
                    radius * phi.cos(),
                    radius * phi.sin(),
                    position.z + z.sample(&mut rng),
                );
            }
            track.hits.push((layer, HitId(event.hits.len())));
            event.hits.push(position);
        }

        let seed_hits: Option<Vec<Point3<f64>>> = config
            .seed_layers
            .iter()
            .map(|&l| track.hit_on(l).map(|id| event.hits[id.index()]))
            .collect();
        if let Some(points) = seed_hits {
            event.seeds.push(Seed::new(points, charge, segment.curvature));
            event.seed_truth.push(event.truth.len());
        }
        event.truth.push(track);
    }

    Ok(event)
}
