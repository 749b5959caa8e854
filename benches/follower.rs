//! Criterion benchmarks for track following.
//!
//! Run with: cargo bench
//! Run specific group: cargo bench -- follow
//! Run specific variant: cargo bench -- Helix-Precise

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use tpc_track_follower::bench_utils::{
    create_follower, prepare, run_follow, ScenarioJson, BENCH_SCENARIOS, FOLLOWER_VARIANTS,
};
use tpc_track_follower::common::ground_truth::{generate_event, GroundTruthConfig};
use tpc_track_follower::{
    DetectorGeometry, FollowerConfig, HelixKalmanFitter, Tracker, TrackerConfig,
};

// =============================================================================
// Follower Variants
// =============================================================================

fn bench_follow(c: &mut Criterion) {
    let mut group = c.benchmark_group("follow");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let fitter = HelixKalmanFitter::default();
    for scenario_cfg in BENCH_SCENARIOS {
        let prep = prepare(&ScenarioJson::from_config(scenario_cfg, 42)).unwrap();

        for variant in FOLLOWER_VARIANTS {
            let follower = create_follower(variant, FollowerConfig::default()).unwrap();
            group.bench_function(BenchmarkId::new(*variant, scenario_cfg.name), |b| {
                b.iter(|| run_follow(&follower, &fitter, &prep).unwrap())
            });
        }
    }

    group.finish();
}

// =============================================================================
// Per-Event Driver
// =============================================================================

fn bench_process_event(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_event");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let geometry = DetectorGeometry::sphenix_tpc();
    let event = generate_event(
        &geometry,
        &GroundTruthConfig::default().with_num_tracks(100),
        7,
    )
    .unwrap();
    let mut tracker = Tracker::new(TrackerConfig::default())
        .unwrap()
        .with_geometry(geometry);

    group.bench_function("n100_clean", |b| {
        b.iter(|| tracker.process_event(&event.hits, &event.seeds).unwrap())
    });

    group.finish();
}

criterion_group!(follower_benches, bench_follow, bench_process_event);

criterion_main!(follower_benches);
