/*!
# TPC track follower

Directional Kalman-filter track following for a cylindrical time projection
chamber. Starting from short seeds, each track is extended layer by layer
outward and then inward: predict to the next layer, gate the hits around the
prediction, update with the best one, and tolerate a bounded number of missed
layers.

## Features

- Helix or least-squares seeding of the initial state
- Optional precise refit over all accepted hits
- Shared or exclusive hit ownership between tracks
- Parallel seeds (with the `rayon` feature)

## Modules

- [`follower`] - [`TrackFollower`] and the interfaces it is built on
- [`components`] - Helix transport, Kalman update, seed fitting, fit engine
- [`association`] - Hit lookup, gating and hit claims
- [`field`] - Magnetic field models
- [`tracker`] - Per-event driver
- [`types`] - Data model and configuration
- [`common`] - Constants, linear algebra, synthetic events

## Example

```rust,no_run
use nalgebra::Point3;
use tpc_track_follower::{DetectorGeometry, Seed, Tracker, TrackerConfig};

let mut tracker = Tracker::new(TrackerConfig::default())
    .unwrap()
    .with_geometry(DetectorGeometry::sphenix_tpc());
tracker.set_track_follower_optimization_helix(true);

let hits: Vec<Point3<f64>> = Vec::new();
let seeds: Vec<Seed> = Vec::new();
let result = tracker.process_event(&hits, &seeds).unwrap();
println!("{} tracks, {}", result.tracks.len(), result.stats.to_json());
```
*/

pub mod association;
pub mod bench_utils;
pub mod common;
pub mod components;
pub mod field;
pub mod follower;
pub mod tracker;
pub mod types;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// Core types
pub use types::{
    ConfigSnapshot, DetectorGeometry, Direction, FinishedTrack, FitterConfig, FollowStatus,
    FollowerConfig, Hit, HitId, HitSharing, LayerResolution, Measurement, ResolutionModel, Seed,
    StartPoint, Surface, TrackCandidate, TrackState,
};

// Errors
pub use follower::TrackingError;

// Traits
pub use follower::{FieldModel, FitEngine, HitLookup};

// Follower
pub use follower::{FollowContext, FollowOutput, FollowStats, SeedOutcome, TrackFollower};

// Implementations
pub use association::LayeredHitLookup;
pub use components::HelixKalmanFitter;
pub use field::{FieldSource, SolenoidField, UniformField};

// Driver
pub use tracker::{EventResult, Tracker, TrackerConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
