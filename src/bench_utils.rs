//! Benchmark utilities shared between the Criterion benchmarks and the demo.
//!
//! This module provides:
//! - JSON schema for scenario files
//! - Scenario preparation (geometry plus a generated event)
//! - Follower factory by variant name
//! - Timed follow runs

use serde::Deserialize;
use std::fs;
use std::time::Instant;

use crate::association::LayeredHitLookup;
use crate::common::ground_truth::{generate_event, GroundTruthConfig, SyntheticEvent};
use crate::components::HelixKalmanFitter;
use crate::field::UniformField;
use crate::follower::{FollowContext, FollowOutput, HitLookup, TrackFollower, TrackingError};
use crate::types::{DetectorGeometry, FollowerConfig, HitSharing, LayerResolution};

// =============================================================================
// Benchmark Scenarios
// =============================================================================

/// Built-in scenario descriptor
pub struct ScenarioConfig {
    pub name: &'static str,
    pub num_tracks: usize,
    pub smeared: bool,
}

/// Scenarios exercised by the Criterion benchmarks
pub const BENCH_SCENARIOS: &[ScenarioConfig] = &[
    ScenarioConfig {
        name: "n10_clean",
        num_tracks: 10,
        smeared: false,
    },
    ScenarioConfig {
        name: "n50_smeared",
        num_tracks: 50,
        smeared: true,
    },
    ScenarioConfig {
        name: "n200_smeared",
        num_tracks: 200,
        smeared: true,
    },
];

/// Follower variants, named after the two seeding and fitting switches
pub const FOLLOWER_VARIANTS: &[&str] = &[
    "LSQ",
    "Helix",
    "LSQ-Precise",
    "Helix-Precise",
    "Helix-Exclusive",
];

// =============================================================================
// JSON Schema for Scenario Files
// =============================================================================

/// Root structure for scenario JSON files
#[derive(Deserialize, Clone, Debug)]
pub struct ScenarioJson {
    pub num_tracks: usize,
    pub seed: u64,
    #[serde(default = "default_bz")]
    pub bz: f64,
    pub pt_range: Option<[f64; 2]>,
    pub tan_lambda_range: Option<[f64; 2]>,
    /// `[rphi, z]` hit smearing (cm)
    pub smearing: Option<[f64; 2]>,
    pub detector: Option<DetectorJson>,
}

/// Detector description from scenario JSON
#[derive(Deserialize, Clone, Debug)]
pub struct DetectorJson {
    pub num_layers: usize,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub half_length: f64,
}

fn default_bz() -> f64 {
    crate::common::constants::DEFAULT_BZ_TESLA
}

impl ScenarioJson {
    /// Scenario equivalent of a built-in descriptor
    pub fn from_config(config: &ScenarioConfig, seed: u64) -> Self {
        Self {
            num_tracks: config.num_tracks,
            seed,
            bz: default_bz(),
            pt_range: None,
            tan_lambda_range: None,
            smearing: config.smeared.then_some([0.02, 0.08]),
            detector: None,
        }
    }
}

/// Load a scenario from a JSON file
pub fn load_scenario(path: &str) -> Result<ScenarioJson, String> {
    let content =
        fs::read_to_string(path).map_err(|err| format!("Failed to read {}: {}", path, err))?;
    serde_json::from_str(&content).map_err(|err| format!("Failed to parse {}: {}", path, err))
}

// =============================================================================
// Prepared Scenario
// =============================================================================

/// Geometry and generated event ready for following
#[derive(Clone, Debug)]
pub struct PreparedScenario {
    pub geometry: DetectorGeometry,
    pub event: SyntheticEvent,
    pub field: UniformField,
}

/// Build the detector and generate the event of a scenario
pub fn prepare(scenario: &ScenarioJson) -> Result<PreparedScenario, TrackingError> {
    let geometry = match &scenario.detector {
        Some(det) => DetectorGeometry::uniform(
            det.num_layers,
            det.inner_radius,
            det.outer_radius,
            det.half_length,
        )?,
        None => DetectorGeometry::sphenix_tpc(),
    };

    let mut truth_config = GroundTruthConfig::default().with_num_tracks(scenario.num_tracks);
    truth_config.bz = scenario.bz;
    if let Some([lo, hi]) = scenario.pt_range {
        truth_config.pt_range = (lo, hi);
    }
    if let Some([lo, hi]) = scenario.tan_lambda_range {
        truth_config.tan_lambda_range = (lo, hi);
    }
    if let Some([rphi, z]) = scenario.smearing {
        truth_config = truth_config.with_smearing(LayerResolution::new(rphi, z));
    }
    if geometry.num_layers() < 25 {
        let mid = geometry.num_layers() / 2;
        truth_config = truth_config.with_seed_layers([mid.saturating_sub(2), mid, mid + 2]);
    }

    let event = generate_event(&geometry, &truth_config, scenario.seed)?;
    Ok(PreparedScenario {
        geometry,
        event,
        field: UniformField::new(scenario.bz),
    })
}

// =============================================================================
// Follower Factory
// =============================================================================

/// Create a follower by variant name on top of `base`
pub fn create_follower(name: &str, base: FollowerConfig) -> Result<TrackFollower, String> {
    let config = match name {
        "LSQ" => base.with_optimization_helix(false),
        "Helix" => base.with_optimization_helix(true),
        "LSQ-Precise" => base
            .with_optimization_helix(false)
            .with_optimization_precise_fit(true),
        "Helix-Precise" => base
            .with_optimization_helix(true)
            .with_optimization_precise_fit(true),
        "Helix-Exclusive" => base
            .with_optimization_helix(true)
            .with_hit_sharing(HitSharing::Exclusive),
        _ => return Err(format!("Unknown follower variant: {}", name)),
    };
    TrackFollower::new(config).map_err(|err| err.to_string())
}

/// Follow all seeds of a prepared scenario once
pub fn run_follow(
    follower: &TrackFollower,
    fitter: &HelixKalmanFitter,
    prep: &PreparedScenario,
) -> Result<FollowOutput, TrackingError> {
    let mut lookup = LayeredHitLookup::new(prep.geometry.clone());
    lookup.init(&prep.event.hits);
    let ctx = FollowContext::new(&prep.field, &prep.geometry, &lookup, fitter);
    follower.follow_tracks(&prep.event.seeds, &ctx)
}

/// Follow a scenario `repeats` times, returning (mean_ms, std_ms)
pub fn run_timed(
    follower: &TrackFollower,
    fitter: &HelixKalmanFitter,
    prep: &PreparedScenario,
    repeats: usize,
) -> Result<(f64, f64), TrackingError> {
    let mut times = Vec::with_capacity(repeats);
    for _ in 0..repeats.max(1) {
        let start = Instant::now();
        run_follow(follower, fitter, prep)?;
        times.push(start.elapsed().as_micros() as f64 / 1000.0);
    }
    Ok(compute_stats(&times))
}

fn compute_stats(times: &[f64]) -> (f64, f64) {
    let n = times.len() as f64;
    let mean = times.iter().sum::<f64>() / n;
    let variance = times.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
