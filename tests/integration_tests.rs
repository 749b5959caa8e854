//! Integration tests for the per-event tracker
//!
//! Runs generated events through `Tracker::process_event` with every
//! combination of the seeding and refit switches and checks field and
//! geometry handling.

use tpc_track_follower::common::ground_truth::{generate_event, GroundTruthConfig};
use tpc_track_follower::{
    DetectorGeometry, FollowerConfig, LayerResolution, SolenoidField, Tracker, TrackerConfig,
    TrackingError,
};

fn tracker(config: TrackerConfig) -> Tracker {
    Tracker::new(config)
        .unwrap()
        .with_geometry(DetectorGeometry::sphenix_tpc())
}

/// All switch combinations reconstruct a clean event
#[test]
fn test_process_event_switches() {
    let geometry = DetectorGeometry::sphenix_tpc();
    let event =
        generate_event(&geometry, &GroundTruthConfig::default().with_num_tracks(8), 42).unwrap();

    for helix in [true, false] {
        for precise in [false, true] {
            let mut tracker = tracker(TrackerConfig::default());
            tracker.set_track_follower_optimization_helix(helix);
            tracker.set_track_follower_optimization_precise_fit(precise);

            let result = tracker.process_event(&event.hits, &event.seeds).unwrap();
            assert_eq!(result.tracks.len(), 8, "helix = {}, precise = {}", helix, precise);
            assert_eq!(result.stats.seeds, 8);
            assert_eq!(result.bz, 1.4);
            assert!(result.tracks.iter().all(|t| t.refitted == precise));
            assert!(result.tracks_per_second >= 0.0);
        }
    }
}

/// The tracker can be reused across events
#[test]
fn test_consecutive_events() {
    let geometry = DetectorGeometry::sphenix_tpc();
    let config = GroundTruthConfig::default()
        .with_num_tracks(5)
        .with_smearing(LayerResolution::new(0.02, 0.08));
    let mut tracker = tracker(TrackerConfig::default());

    for seed in 0..3 {
        let event = generate_event(&geometry, &config, seed).unwrap();
        let result = tracker.process_event(&event.hits, &event.seeds).unwrap();
        assert_eq!(result.stats.seeds, event.seeds.len());
        for track in &result.tracks {
            for id in track.hit_ids() {
                assert!(id.index() < event.hits.len());
            }
        }
    }
}

/// A field map sets the nominal field of the event
#[test]
fn test_field_map_value() {
    let geometry = DetectorGeometry::sphenix_tpc();
    let mut truth = GroundTruthConfig::default().with_num_tracks(4);
    truth.bz = 1.5;
    let event = generate_event(&geometry, &truth, 9).unwrap();

    let map = SolenoidField::new(1.5, 100.0, 150.0).unwrap();
    let mut tracker = tracker(TrackerConfig::default()).with_field_map(Box::new(map));
    let result = tracker.process_event(&event.hits, &event.seeds).unwrap();
    assert_eq!(result.bz, 1.5);
    assert_eq!(result.tracks.len(), 4);
    for (track, &truth_index) in result.tracks.iter().zip(&event.seed_truth) {
        let expected = event.truth[truth_index].pt;
        let pt = track.pt().unwrap();
        assert!((pt - expected).abs() < 1e-3 * expected, "pt {} vs {}", pt, expected);
    }
}

/// Missing inputs are reported, not guessed
#[test]
fn test_missing_inputs() {
    let mut no_geometry = Tracker::new(TrackerConfig::default()).unwrap();
    assert_eq!(
        no_geometry.process_event(&[], &[]).unwrap_err(),
        TrackingError::MissingGeometry
    );

    let mut no_map = tracker(TrackerConfig::default().with_require_field_map(true));
    assert_eq!(
        no_map.process_event(&[], &[]).unwrap_err(),
        TrackingError::MissingField
    );

    let mut fallback = tracker(TrackerConfig::default());
    let result = fallback.process_event(&[], &[]).unwrap();
    assert_eq!(result.bz, 1.4);
    assert!(result.tracks.is_empty());
}

/// Invalid configurations are rejected at construction
#[test]
fn test_invalid_config() {
    let config =
        TrackerConfig::default().with_follower(FollowerConfig::default().with_chi2_cut(-1.0));
    assert!(matches!(
        Tracker::new(config),
        Err(TrackingError::Configuration { .. })
    ));
}

/// The configuration snapshot reflects the switches
#[test]
fn test_snapshot_reflects_switches() {
    let mut tracker = tracker(TrackerConfig::default());
    tracker.set_track_follower_optimization_precise_fit(true);
    let snapshot = tracker.snapshot().unwrap();
    assert!(snapshot.follower.optimization_precise_fit);

    let json: serde_json::Value = serde_json::from_str(&snapshot.to_json()).unwrap();
    assert_eq!(json["follower"]["optimization_precise_fit"], true);
    assert_eq!(json["geometry"]["layer_radii"].as_array().unwrap().len(), 48);
}
