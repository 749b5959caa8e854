//! Shared and exclusive hit ownership

use tpc_track_follower::{FollowerConfig, HitSharing};

use super::helpers::Scenario;

/// Shared mode follows duplicated seeds twice
#[test]
fn test_shared_duplicates() {
    let scenario = Scenario::clean(6, 3);
    let mut seeds = scenario.event.seeds.clone();
    seeds.extend(scenario.event.seeds.iter().cloned());

    let output = scenario.follow_seeds(FollowerConfig::default(), &seeds);
    assert_eq!(output.tracks.len(), 12);
    for (a, b) in output.tracks[..6].iter().zip(&output.tracks[6..]) {
        assert_eq!(a.hit_ids(), b.hit_ids());
    }
}

/// Exclusive mode skips seeds whose start hit an earlier track claimed
#[test]
fn test_exclusive_claims() {
    let scenario = Scenario::clean(6, 3);
    let mut seeds = scenario.event.seeds.clone();
    seeds.extend(scenario.event.seeds.iter().cloned());

    let config = FollowerConfig::default().with_hit_sharing(HitSharing::Exclusive);
    let output = scenario.follow_seeds(config, &seeds);
    assert_eq!(output.tracks.len(), 6);
    assert_eq!(output.stats.claimed_seeds, 6);
    assert!(output.tracks.iter().all(|t| t.seed_index < 6));

    let mut all: Vec<_> = output.tracks.iter().flat_map(|t| t.hit_ids()).collect();
    let total = all.len();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), total, "a hit was used by two tracks");
}

/// Without duplicates both policies agree on a clean event
#[test]
fn test_policies_agree_on_clean_event() {
    let scenario = Scenario::clean(10, 61);
    let shared = scenario.follow(FollowerConfig::default());
    let exclusive =
        scenario.follow(FollowerConfig::default().with_hit_sharing(HitSharing::Exclusive));

    assert_eq!(shared.tracks.len(), exclusive.tracks.len());
    for (a, b) in shared.tracks.iter().zip(&exclusive.tracks) {
        assert_eq!(a.hit_ids(), b.hit_ids());
    }
}
