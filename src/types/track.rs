//! In-progress and finished track types

use serde::Serialize;
use smallvec::SmallVec;

use super::hit::{HitId, Measurement};
use super::state::{Direction, TrackState};

/// Which part of the follow procedure accepted a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pass {
    /// The seed hit the initial state sits on
    Start,
    /// Accepted while following outward
    Outward,
    /// Accepted while following inward
    Inward,
}

impl From<Direction> for Pass {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Outward => Pass::Outward,
            Direction::Inward => Pass::Inward,
        }
    }
}

/// A measurement accepted into a track
#[derive(Debug, Clone)]
pub struct AcceptedHit {
    /// Measurement that was used in the update
    pub measurement: Measurement,
    /// Pass that accepted it
    pub pass: Pass,
    /// Chi-square increment of the update (zero for the start hit)
    pub chi2: f64,
}

impl AcceptedHit {
    /// Layer of the hit
    #[inline]
    pub fn layer(&self) -> usize {
        self.measurement.layer
    }

    /// Originating hit id
    #[inline]
    pub fn hit(&self) -> Option<HitId> {
        self.measurement.hit
    }
}

/// Outcome classification of a followed seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FollowStatus {
    /// New hits were added in both directions
    Full,
    /// New hits were added in one direction only
    Partial,
    /// No new hit beyond the seed, or too few hits overall
    Discarded,
}

/// A seed being grown into a track
///
/// Holds the seed-initial state that both passes restart from and the list of
/// accepted measurements in acceptance order.
#[derive(Debug, Clone)]
pub struct TrackCandidate {
    /// Index of the seed in the caller's seed list
    pub seed_index: usize,
    /// State on the start hit; both passes begin here
    pub start_state: TrackState,
    /// Hits that belong to the seed itself
    pub seed_hits: SmallVec<[HitId; 4]>,
    /// Accepted measurements in acceptance order
    pub hits: Vec<AcceptedHit>,
}

impl TrackCandidate {
    /// Create a candidate with its start hit already accepted
    pub fn new(
        seed_index: usize,
        start_state: TrackState,
        start: Measurement,
        seed_hits: SmallVec<[HitId; 4]>,
    ) -> Self {
        Self {
            seed_index,
            start_state,
            seed_hits,
            hits: vec![AcceptedHit {
                measurement: start,
                pass: Pass::Start,
                chi2: 0.0,
            }],
        }
    }

    /// Append an accepted measurement
    pub fn accept(&mut self, measurement: Measurement, pass: Pass, chi2: f64) {
        self.hits.push(AcceptedHit {
            measurement,
            pass,
            chi2,
        });
    }

    /// True if `hit` is already on the track
    pub fn contains(&self, hit: HitId) -> bool {
        self.hits.iter().any(|h| h.hit() == Some(hit))
    }

    /// True if `hit` is one of the seed's own hits
    pub fn is_seed_hit(&self, hit: HitId) -> bool {
        self.seed_hits.contains(&hit)
    }

    /// Layer of the start hit
    pub fn start_layer(&self) -> usize {
        self.hits[0].layer()
    }

    /// Number of hits accepted by `pass` that are not seed hits
    pub fn new_hits(&self, pass: Pass) -> usize {
        self.hits
            .iter()
            .filter(|h| h.pass == pass)
            .filter(|h| h.hit().map_or(true, |id| !self.is_seed_hit(id)))
            .count()
    }
}

/// A completed track handed back to the caller
#[derive(Debug, Clone)]
pub struct FinishedTrack {
    /// Index of the seed in the caller's seed list
    pub seed_index: usize,
    /// Start hit, then the outward pass (increasing layer), then the inward
    /// pass (decreasing layer)
    pub hits: Vec<AcceptedHit>,
    /// State at the innermost accepted hit
    pub inner_state: TrackState,
    /// State at the outermost accepted hit
    pub outer_state: TrackState,
    /// Final reported state: the last growth update, or the refitted inner
    /// state when the precise refit ran
    pub final_state: TrackState,
    /// Total chi-square
    pub chi2: f64,
    /// Degrees of freedom
    pub ndf: usize,
    /// Follow classification (never `Discarded` for returned tracks)
    pub status: FollowStatus,
    /// True if the precise refit replaced the growth states
    pub refitted: bool,
}

impl FinishedTrack {
    /// Number of accepted measurements
    #[inline]
    pub fn num_measurements(&self) -> usize {
        self.hits.len()
    }

    /// Layers of all accepted hits, in list order
    pub fn layers(&self) -> Vec<usize> {
        self.hits.iter().map(|h| h.layer()).collect()
    }

    /// Layers accepted by one pass, in acceptance order
    pub fn pass_layers(&self, pass: Pass) -> Vec<usize> {
        self.hits
            .iter()
            .filter(|h| h.pass == pass)
            .map(|h| h.layer())
            .collect()
    }

    /// Sorted hit ids of the track
    pub fn hit_ids(&self) -> Vec<HitId> {
        let mut ids: Vec<HitId> = self.hits.iter().filter_map(|h| h.hit()).collect();
        ids.sort_unstable();
        ids
    }

    /// Measurements ordered by increasing radius
    pub fn measurements_by_radius(&self) -> Vec<Measurement> {
        let mut ms: Vec<Measurement> = self.hits.iter().map(|h| h.measurement.clone()).collect();
        ms.sort_by(|a, b| {
            a.radius
                .partial_cmp(&b.radius)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ms
    }

    /// Chi-square per degree of freedom
    pub fn reduced_chi2(&self) -> f64 {
        if self.ndf == 0 {
            0.0
        } else {
            self.chi2 / self.ndf as f64
        }
    }

    /// Charge sign from the final state
    pub fn charge(&self) -> i8 {
        self.final_state.charge()
    }

    /// Transverse momentum from the final state
    pub fn pt(&self) -> Option<f64> {
        self.final_state.pt()
    }
}
