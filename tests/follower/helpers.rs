//! Shared scenario setup for follower tests

#![allow(dead_code)]

use tpc_track_follower::common::ground_truth::{generate_event, GroundTruthConfig, SyntheticEvent};
use tpc_track_follower::types::Pass;
use tpc_track_follower::{
    DetectorGeometry, FinishedTrack, FollowContext, FollowOutput, FollowerConfig, HelixKalmanFitter,
    HitLookup, LayerResolution, LayeredHitLookup, Seed, TrackFollower, UniformField,
};

/// Geometry, event, field, fit engine and an indexed hit lookup
pub struct Scenario {
    pub geometry: DetectorGeometry,
    pub event: SyntheticEvent,
    pub field: UniformField,
    pub fitter: HelixKalmanFitter,
    pub lookup: LayeredHitLookup,
}

impl Scenario {
    /// Noiseless event in the 48-layer TPC
    pub fn clean(num_tracks: usize, seed: u64) -> Self {
        Self::generate(GroundTruthConfig::default().with_num_tracks(num_tracks), seed)
    }

    /// Event with hits smeared at the default resolution
    pub fn smeared(num_tracks: usize, seed: u64) -> Self {
        let config = GroundTruthConfig::default()
            .with_num_tracks(num_tracks)
            .with_smearing(LayerResolution::new(0.02, 0.08));
        Self::generate(config, seed)
    }

    pub fn generate(config: GroundTruthConfig, seed: u64) -> Self {
        let geometry = DetectorGeometry::sphenix_tpc();
        let event = generate_event(&geometry, &config, seed).unwrap();
        Self::from_event(geometry, event)
    }

    pub fn from_event(geometry: DetectorGeometry, event: SyntheticEvent) -> Self {
        let mut lookup = LayeredHitLookup::new(geometry.clone());
        lookup.init(&event.hits);
        Self {
            geometry,
            event,
            field: UniformField::new(1.4),
            fitter: HelixKalmanFitter::default(),
            lookup,
        }
    }

    pub fn ctx(&self) -> FollowContext<'_> {
        FollowContext::new(&self.field, &self.geometry, &self.lookup, &self.fitter)
    }

    /// Follow all seeds of the event
    pub fn follow(&self, config: FollowerConfig) -> FollowOutput {
        self.follow_seeds(config, &self.event.seeds)
    }

    pub fn follow_seeds(&self, config: FollowerConfig, seeds: &[Seed]) -> FollowOutput {
        let follower = TrackFollower::new(config).unwrap();
        follower.follow_tracks(seeds, &self.ctx()).unwrap()
    }
}

/// Assert per-pass layer ordering and unique hits
pub fn assert_pass_ordering(track: &FinishedTrack) {
    let start = track.hits[0].layer();
    assert_eq!(track.hits[0].pass, Pass::Start);

    let outward = track.pass_layers(Pass::Outward);
    assert!(outward.windows(2).all(|w| w[1] > w[0]), "outward {:?}", outward);
    assert!(outward.iter().all(|&l| l > start));

    let inward = track.pass_layers(Pass::Inward);
    assert!(inward.windows(2).all(|w| w[1] < w[0]), "inward {:?}", inward);
    assert!(inward.iter().all(|&l| l < start));

    let ids = track.hit_ids();
    let mut unique = ids.clone();
    unique.dedup();
    assert_eq!(ids.len(), unique.len(), "duplicate hit on track");
}
