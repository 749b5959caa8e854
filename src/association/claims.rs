//! Hit ownership table for exclusive hit sharing
//!
//! Lives for one `follow_tracks` call. A hit is claimed by the first accepted
//! track that contains it; later seeds skip claimed hits during association.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::HitId;

/// Per-call record of hits owned by accepted tracks
#[derive(Debug, Default)]
pub struct HitClaims {
    claimed: Vec<AtomicBool>,
}

impl HitClaims {
    /// Table for an event with `num_hits` hits
    pub fn new(num_hits: usize) -> Self {
        Self {
            claimed: (0..num_hits).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// True if `hit` belongs to an accepted track
    pub fn is_claimed(&self, hit: HitId) -> bool {
        self.claimed
            .get(hit.index())
            .is_some_and(|c| c.load(Ordering::Acquire))
    }

    /// Claim all `hits`; returns how many were newly claimed
    pub fn claim_all(&self, hits: impl IntoIterator<Item = HitId>) -> usize {
        hits.into_iter()
            .filter_map(|hit| self.claimed.get(hit.index()))
            .filter(|c| !c.swap(true, Ordering::AcqRel))
            .count()
    }

    /// Number of claimed hits
    pub fn count(&self) -> usize {
        self.claimed
            .iter()
            .filter(|c| c.load(Ordering::Acquire))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims() {
        let claims = HitClaims::new(4);
        assert!(!claims.is_claimed(HitId(1)));
        assert_eq!(claims.claim_all([HitId(1), HitId(2), HitId(9)]), 2);
        assert!(claims.is_claimed(HitId(1)));
        assert_eq!(claims.claim_all([HitId(1), HitId(3)]), 1);
        assert_eq!(claims.count(), 3);
        assert!(!claims.is_claimed(HitId(9)));
    }
}
