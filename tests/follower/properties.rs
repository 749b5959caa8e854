//! Following properties on generated events

use nalgebra::Point3;
use tpc_track_follower::common::ground_truth::{generate_event, GroundTruthConfig};
use tpc_track_follower::types::Pass;
use tpc_track_follower::{
    DetectorGeometry, FollowStatus, FollowerConfig, HitLookup, Seed, StartPoint,
};

use super::helpers::{assert_pass_ordering, Scenario};

/// Noiseless helix: every layer is found in both seeding modes
#[test]
fn test_clean_track_full_coverage() {
    let scenario = Scenario::clean(1, 17);
    let num_layers = scenario.geometry.num_layers();

    for helix in [true, false] {
        let output = scenario.follow(FollowerConfig::default().with_optimization_helix(helix));
        assert_eq!(output.tracks.len(), 1, "helix = {}", helix);

        let track = &output.tracks[0];
        assert_eq!(track.status, FollowStatus::Full);
        assert_eq!(track.num_measurements(), num_layers);
        let mut layers = track.layers();
        layers.sort_unstable();
        assert_eq!(layers, (0..num_layers).collect::<Vec<_>>());
        let truth_ids: Vec<_> = scenario.event.truth[0].hits.iter().map(|(_, id)| *id).collect();
        assert_eq!(track.hit_ids(), truth_ids);
        assert_eq!(track.charge(), scenario.event.truth[0].charge);
    }
}

/// The start hit can sit on the innermost seed point as well
#[test]
fn test_innermost_start_point() {
    let scenario = Scenario::clean(1, 23);
    let output = scenario.follow(FollowerConfig::default().with_start_point(StartPoint::Innermost));
    assert_eq!(output.tracks.len(), 1);

    let track = &output.tracks[0];
    assert_eq!(track.hits[0].layer(), 20);
    assert_eq!(track.num_measurements(), scenario.geometry.num_layers());
    assert_pass_ordering(track);
}

/// A missing hit is bridged and leaves the track one measurement short
#[test]
fn test_gap_is_bridged() {
    let clean = Scenario::clean(1, 5);
    let full = clean.follow(FollowerConfig::default()).tracks[0].num_measurements();

    for layer in [35, 10] {
        let mut event = clean.event.clone();
        assert!(event.remove_hit(0, layer).is_some());
        let scenario = Scenario::from_event(clean.geometry.clone(), event);
        let output = scenario.follow(FollowerConfig::default());

        assert_eq!(output.tracks.len(), 1);
        let track = &output.tracks[0];
        assert!(track.num_measurements() < full);
        assert_eq!(track.num_measurements(), full - 1);
        assert!(!track.layers().contains(&layer));
        assert_pass_ordering(track);
    }
}

/// Consecutive gaps beyond the tolerance end the pass
#[test]
fn test_miss_limit_ends_pass() {
    let clean = Scenario::clean(1, 9);
    let mut event = clean.event.clone();
    for layer in [30, 31, 32] {
        assert!(event.remove_hit(0, layer).is_some());
    }
    let scenario = Scenario::from_event(clean.geometry.clone(), event);
    let output = scenario.follow(FollowerConfig::default().with_max_missed_layers(2));

    let track = &output.tracks[0];
    assert_eq!(track.pass_layers(Pass::Outward), (25..30).collect::<Vec<_>>());
    assert_eq!(track.status, FollowStatus::Full);

    let output = scenario.follow(FollowerConfig::default().with_max_missed_layers(3));
    assert_eq!(output.tracks[0].num_measurements(), scenario.geometry.num_layers() - 3);
}

/// Hits inside a layer's radial tolerance but off its nominal radius are
/// gated at their own radius
#[test]
fn test_off_radius_hits_associated() {
    let nominal = DetectorGeometry::sphenix_tpc();
    let shifted_radii: Vec<f64> = nominal.radii().iter().map(|r| r + 0.4).collect();
    let shifted = DetectorGeometry::new(shifted_radii, nominal.half_length()).unwrap();

    let mut config = GroundTruthConfig::default().with_num_tracks(1);
    config.pt_range = (1.0, 1.0);
    config.tan_lambda_range = (1.0, 1.0);
    let event = generate_event(&shifted, &config, 19).unwrap();
    assert_eq!(event.truth[0].hits.len(), nominal.num_layers());

    let scenario = Scenario::from_event(nominal, event);
    assert_eq!(scenario.lookup.len(), scenario.event.hits.len());

    for helix in [true, false] {
        let output = scenario.follow(FollowerConfig::default().with_optimization_helix(helix));
        assert_eq!(output.stats.discarded, 0, "helix = {}", helix);
        assert_eq!(output.tracks.len(), 1);

        let track = &output.tracks[0];
        assert_eq!(track.status, FollowStatus::Full);
        assert_eq!(track.num_measurements(), scenario.geometry.num_layers());
        assert!(track.reduced_chi2() < 1.0);
        assert_pass_ordering(track);
    }
}

/// A steep track leaving the volume aborts only its outward pass
#[test]
fn test_outward_abort_keeps_inward_pass() {
    let mut config = GroundTruthConfig::default()
        .with_num_tracks(1)
        .with_seed_layers([2, 4, 6]);
    config.tan_lambda_range = (2.4, 2.5);
    let scenario = Scenario::generate(config, 13);
    let truth_layers: Vec<usize> = scenario.event.truth[0].hits.iter().map(|(l, _)| *l).collect();
    let last_layer = *truth_layers.last().unwrap();
    assert!(last_layer > 6 && last_layer + 1 < scenario.geometry.num_layers());

    let output = scenario.follow(FollowerConfig::default());
    assert_eq!(output.stats.aborted_passes, 1);
    assert_eq!(output.tracks.len(), 1);

    let track = &output.tracks[0];
    assert_eq!(track.status, FollowStatus::Full);
    assert_eq!(track.pass_layers(Pass::Outward), (7..=last_layer).collect::<Vec<_>>());
    assert_eq!(track.pass_layers(Pass::Inward), (0..6).rev().collect::<Vec<_>>());
    assert_eq!(track.num_measurements(), truth_layers.len());
}

/// Collinear seeds define no curvature and are rejected in both modes
#[test]
fn test_collinear_seed_rejected() {
    let scenario = Scenario::clean(1, 2);
    let seed = Seed::from_points([
        Point3::new(40.0, 0.0, 1.0),
        Point3::new(41.0, 0.0, 1.5),
        Point3::new(42.0, 0.0, 2.0),
    ]);

    for helix in [true, false] {
        let config = FollowerConfig::default().with_optimization_helix(helix);
        let output = scenario.follow_seeds(config, std::slice::from_ref(&seed));
        assert!(output.tracks.is_empty());
        assert_eq!(output.stats.degenerate, 1);
        assert_eq!(output.stats.seeds, 1);
    }
}

/// Seeds with too few or off-layer points never reach following
#[test]
fn test_short_and_off_layer_seeds() {
    let scenario = Scenario::clean(1, 4);
    let short = Seed::from_points([Point3::new(40.0, 0.0, 1.0), Point3::new(41.0, 0.5, 1.5)]);
    let off_layer = Seed::from_points([
        Point3::new(85.0, 0.0, 1.0),
        Point3::new(86.0, 0.3, 1.5),
        Point3::new(87.0, 0.9, 2.0),
    ]);
    let output = scenario.follow_seeds(FollowerConfig::default(), &[short, off_layer]);
    assert!(output.tracks.is_empty());
    assert_eq!(output.stats.degenerate, 2);
}

/// Pass ordering and hit uniqueness hold on a noisy event
#[test]
fn test_pass_ordering_smeared() {
    let scenario = Scenario::smeared(30, 101);
    for helix in [true, false] {
        let output = scenario.follow(FollowerConfig::default().with_optimization_helix(helix));
        let stats = &output.stats;
        assert_eq!(stats.seeds, scenario.event.seeds.len());
        assert_eq!(stats.tracks, output.tracks.len());
        assert_eq!(
            stats.tracks + stats.discarded + stats.degenerate + stats.claimed_seeds,
            stats.seeds
        );
        for track in &output.tracks {
            assert_ne!(track.status, FollowStatus::Discarded);
            assert!(track.num_measurements() >= FollowerConfig::default().min_hits);
            assert_pass_ordering(track);
        }
    }
}

/// Every seed of a clean 50-track event becomes a complete track
#[test]
fn test_clean_event_all_tracks() {
    let scenario = Scenario::clean(50, 2024);
    assert_eq!(scenario.event.seeds.len(), 50);

    let output = scenario.follow(FollowerConfig::default());
    assert_eq!(output.tracks.len(), 50);
    assert_eq!(output.stats.discarded, 0);
    assert_eq!(output.stats.degenerate, 0);
    for (index, track) in output.tracks.iter().enumerate() {
        assert_eq!(track.seed_index, index);
        assert_eq!(track.num_measurements(), 48);
        assert!(track.reduced_chi2() < 1.0);
    }
}

/// Following seeds one at a time gives the same tracks as the batch
#[test]
fn test_single_seed_calls_match_batch() {
    let scenario = Scenario::smeared(12, 77);
    let batch = scenario.follow(FollowerConfig::default());

    let mut singles = Vec::new();
    for seed in &scenario.event.seeds {
        let output = scenario.follow_seeds(FollowerConfig::default(), std::slice::from_ref(seed));
        singles.extend(output.tracks);
    }

    assert_eq!(batch.tracks.len(), singles.len());
    for (a, b) in batch.tracks.iter().zip(&singles) {
        assert_eq!(a.hit_ids(), b.hit_ids());
        assert_eq!(a.chi2, b.chi2);
        assert_eq!(a.final_state.params, b.final_state.params);
    }
}

/// The worker count does not change the result
#[test]
fn test_thread_count_invariance() {
    let scenario = Scenario::smeared(20, 8);
    let default = scenario.follow(FollowerConfig::default());
    let pinned = scenario.follow(FollowerConfig::default().with_num_threads(2));

    assert_eq!(default.stats, pinned.stats);
    for (a, b) in default.tracks.iter().zip(&pinned.tracks) {
        assert_eq!(a.seed_index, b.seed_index);
        assert_eq!(a.hit_ids(), b.hit_ids());
    }
}
