//! Bidirectional track following
//!
//! Each seed is grown layer by layer, first outward then inward, and both
//! passes restart from the seed's start state. One step of a pass:
//!
//! 1. pick the next layer past the last accepted one (skipping missed layers)
//! 2. predict the state onto that layer's cylinder
//! 3. query the hit lookup in a window sized from the residual covariance
//! 4. project onto each candidate's own cylinder, gate on chi-square and take
//!    the best one
//! 5. apply the Kalman update on the best hit's cylinder
//!
//! A pass ends at the detector edge, after too many consecutive missed layers,
//! or when the prediction fails (the track curls back or leaves the volume).

use serde::Serialize;

use crate::association::{
    gate_candidates, radial_margin, search_window, select_best, GateCandidate, HitClaims,
};
use crate::types::{
    Direction, FinishedTrack, FollowStatus, FollowerConfig, HitSharing, Measurement, Pass,
    Projection, SearchWindow, Seed, Surface, TrackCandidate, TrackState,
};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::errors::TrackingError;
use super::FollowContext;

/// How a directional pass ended
#[derive(Debug, Clone, PartialEq)]
pub enum PassEnd {
    /// No further layer in the travel direction
    DetectorEdge,
    /// Too many consecutive layers without a compatible hit
    MissLimit,
    /// Prediction failed; the pass was abandoned
    Aborted(TrackingError),
}

/// Result of one directional pass
#[derive(Debug, Clone)]
pub struct PassOutcome {
    /// Direction of the pass
    pub dir: Direction,
    /// Why the pass ended
    pub end: PassEnd,
    /// Hits accepted during the pass
    pub accepted: usize,
    /// State after the last update of the pass, if any
    pub last_state: Option<TrackState>,
}

impl PassOutcome {
    /// True if the pass was abandoned on a prediction failure
    pub fn is_aborted(&self) -> bool {
        matches!(self.end, PassEnd::Aborted(_))
    }
}

/// Outcome of following one seed
#[derive(Debug, Clone)]
pub enum SeedOutcome {
    /// The seed produced a track
    Accepted {
        /// The finished track
        track: FinishedTrack,
        /// Passes abandoned on a prediction failure
        aborted_passes: usize,
        /// True if the precise refit failed and growth states were kept
        refit_failed: bool,
    },
    /// The seed was followed but gave too few new hits
    Discarded {
        /// Passes abandoned on a prediction failure
        aborted_passes: usize,
    },
    /// The seed could not define a start state
    Degenerate(TrackingError),
    /// The seed's start hit already belongs to an accepted track
    Claimed,
}

/// Counters of one `follow_tracks` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FollowStats {
    /// Seeds received
    pub seeds: usize,
    /// Tracks returned
    pub tracks: usize,
    /// Seeds followed without enough new hits
    pub discarded: usize,
    /// Seeds rejected before following
    pub degenerate: usize,
    /// Directional passes abandoned on a prediction failure
    pub aborted_passes: usize,
    /// Precise refits that failed
    pub refit_failures: usize,
    /// Seeds skipped because their start hit was already claimed
    pub claimed_seeds: usize,
}

impl FollowStats {
    fn record(&mut self, outcome: &SeedOutcome) {
        self.seeds += 1;
        match outcome {
            SeedOutcome::Accepted {
                aborted_passes,
                refit_failed,
                ..
            } => {
                self.tracks += 1;
                self.aborted_passes += aborted_passes;
                self.refit_failures += usize::from(*refit_failed);
            }
            SeedOutcome::Discarded { aborted_passes } => {
                self.discarded += 1;
                self.aborted_passes += aborted_passes;
            }
            SeedOutcome::Degenerate(_) => self.degenerate += 1,
            SeedOutcome::Claimed => self.claimed_seeds += 1,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Tracks and counters of one `follow_tracks` call
#[derive(Debug, Clone, Default)]
pub struct FollowOutput {
    /// Finished tracks in seed order
    pub tracks: Vec<FinishedTrack>,
    /// Counters
    pub stats: FollowStats,
}

/// Grows seeds into tracks
///
/// Holds only run-level configuration; all per-event inputs arrive through
/// [`FollowContext`].
#[derive(Debug, Clone)]
pub struct TrackFollower {
    config: FollowerConfig,
}

impl TrackFollower {
    /// Create a follower with a validated configuration
    pub fn new(config: FollowerConfig) -> Result<Self, TrackingError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Follower configuration
    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }

    /// Switch between analytic helix seeding and fit-engine seeding
    pub fn set_optimization_helix(&mut self, opt: bool) {
        self.config.optimization_helix = opt;
    }

    /// Switch the precise refit of finished tracks
    pub fn set_optimization_precise_fit(&mut self, opt: bool) {
        self.config.optimization_precise_fit = opt;
    }

    // ========================================================================
    // Event pass
    // ========================================================================

    /// Follow every seed of an event
    ///
    /// Tracks are returned in seed order. Seed and pass failures only exclude
    /// the affected seed or direction.
    ///
    /// # Errors
    /// `MissingGeometry` for a detector without layers, `MissingField` for a
    /// field that is not finite at the origin, and any fatal error raised
    /// while following.
    pub fn follow_tracks(
        &self,
        seeds: &[Seed],
        ctx: &FollowContext<'_>,
    ) -> Result<FollowOutput, TrackingError> {
        if ctx.geometry.is_empty() {
            return Err(TrackingError::MissingGeometry);
        }
        if !ctx.field.value_at(&nalgebra::Point3::origin()).iter().all(|b| b.is_finite()) {
            return Err(TrackingError::MissingField);
        }

        let outcomes = match self.config.hit_sharing {
            HitSharing::Shared => self.follow_shared(seeds, ctx)?,
            HitSharing::Exclusive => self.follow_exclusive(seeds, ctx)?,
        };

        let mut output = FollowOutput::default();
        for outcome in outcomes {
            output.stats.record(&outcome);
            if let SeedOutcome::Accepted { track, .. } = outcome {
                output.tracks.push(track);
            }
        }
        log::debug!("Follow pass: {}", output.stats.to_json());
        Ok(output)
    }

    /// Independent seeds, in parallel when available
    #[cfg(feature = "rayon")]
    fn follow_shared(
        &self,
        seeds: &[Seed],
        ctx: &FollowContext<'_>,
    ) -> Result<Vec<SeedOutcome>, TrackingError> {
        let run = || {
            seeds
                .par_iter()
                .enumerate()
                .map(|(index, seed)| self.follow_seed(index, seed, ctx, None))
                .collect::<Result<Vec<_>, _>>()
        };
        if self.config.num_threads == 0 {
            return run();
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|err| TrackingError::Configuration {
                description: format!("cannot build worker pool: {}", err),
            })?;
        pool.install(run)
    }

    /// Independent seeds, sequentially
    #[cfg(not(feature = "rayon"))]
    fn follow_shared(
        &self,
        seeds: &[Seed],
        ctx: &FollowContext<'_>,
    ) -> Result<Vec<SeedOutcome>, TrackingError> {
        seeds
            .iter()
            .enumerate()
            .map(|(index, seed)| self.follow_seed(index, seed, ctx, None))
            .collect()
    }

    /// Seeds in input order, each claiming the hits of its accepted track
    fn follow_exclusive(
        &self,
        seeds: &[Seed],
        ctx: &FollowContext<'_>,
    ) -> Result<Vec<SeedOutcome>, TrackingError> {
        let claims = HitClaims::new(ctx.lookup.id_bound());
        let mut outcomes = Vec::with_capacity(seeds.len());
        for (index, seed) in seeds.iter().enumerate() {
            let outcome = self.follow_seed(index, seed, ctx, Some(&claims))?;
            if let SeedOutcome::Accepted { track, .. } = &outcome {
                claims.claim_all(track.hit_ids());
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Follow one seed to its outcome
    ///
    /// # Errors
    /// Only fatal errors; everything else is folded into the outcome.
    pub fn follow_seed(
        &self,
        seed_index: usize,
        seed: &Seed,
        ctx: &FollowContext<'_>,
        claims: Option<&HitClaims>,
    ) -> Result<SeedOutcome, TrackingError> {
        let mut candidate = match self.candidate_to_track(seed_index, seed, ctx) {
            Ok(candidate) => candidate,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log::debug!("Seed {} discarded: {}", seed_index, err);
                return Ok(SeedOutcome::Degenerate(err));
            }
        };

        let start_claimed = candidate.hits[0]
            .hit()
            .zip(claims)
            .is_some_and(|(id, claims)| claims.is_claimed(id));
        if start_claimed {
            log::debug!("Seed {} skipped: start hit already claimed", seed_index);
            return Ok(SeedOutcome::Claimed);
        }

        let (outward, inward) = self.propagate_track(&mut candidate, ctx, claims);
        for pass in [&outward, &inward] {
            if let PassEnd::Aborted(err) = &pass.end {
                if err.is_fatal() {
                    return Err(err.clone());
                }
            }
        }
        let aborted_passes = usize::from(outward.is_aborted()) + usize::from(inward.is_aborted());

        let status = self.classify(&candidate);
        if status == FollowStatus::Discarded {
            log::debug!(
                "Seed {} discarded: {} hits, {} new outward, {} new inward",
                seed_index,
                candidate.hits.len(),
                candidate.new_hits(Pass::Outward),
                candidate.new_hits(Pass::Inward)
            );
            return Ok(SeedOutcome::Discarded { aborted_passes });
        }

        let (track, refit_failed) = self.finish_track(candidate, status, outward, inward, ctx);
        log::debug!(
            "Seed {} followed: {:?}, {} hits, chi2/ndf = {:.2}",
            seed_index,
            track.status,
            track.num_measurements(),
            track.reduced_chi2()
        );
        Ok(SeedOutcome::Accepted {
            track,
            aborted_passes,
            refit_failed,
        })
    }

    // ========================================================================
    // Directional passes
    // ========================================================================

    /// Run the outward pass, then the inward pass, from the start state
    pub fn propagate_track(
        &self,
        candidate: &mut TrackCandidate,
        ctx: &FollowContext<'_>,
        claims: Option<&HitClaims>,
    ) -> (PassOutcome, PassOutcome) {
        let outward = self.follow_track(candidate, Direction::Outward, ctx, claims);
        let inward = self.follow_track(candidate, Direction::Inward, ctx, claims);
        (outward, inward)
    }

    /// Layer a pass in direction `dir` continues from
    ///
    /// The outermost accepted layer going outward, the innermost going inward.
    pub fn get_track_layer(candidate: &TrackCandidate, dir: Direction) -> usize {
        let layers = candidate.hits.iter().map(|h| h.layer());
        let extreme = match dir {
            Direction::Outward => layers.max(),
            Direction::Inward => layers.min(),
        };
        extreme.unwrap_or_else(|| candidate.start_layer())
    }

    /// Project a state onto a surface and check it stays in the detector
    ///
    /// # Errors
    /// `ExtrapolationFailed` if the fit engine cannot reach the surface or the
    /// projection leaves the sensitive volume.
    pub fn get_projected_coordinate(
        &self,
        state: &TrackState,
        target: &Surface,
        dir: Direction,
        ctx: &FollowContext<'_>,
    ) -> Result<Projection, TrackingError> {
        let projection = ctx.fitter.predict(state, target, dir, ctx.field)?;
        if !projection.state.is_finite() {
            return Err(TrackingError::extrapolation("projected state is not finite"));
        }
        if !ctx.geometry.contains_z(projection.state.z()) {
            return Err(TrackingError::extrapolation(format!(
                "track leaves the sensitive volume at z = {:.1} cm",
                projection.state.z()
            )));
        }
        Ok(projection)
    }

    /// Follow one direction from the start state
    pub fn follow_track(
        &self,
        candidate: &mut TrackCandidate,
        dir: Direction,
        ctx: &FollowContext<'_>,
        claims: Option<&HitClaims>,
    ) -> PassOutcome {
        let num_layers = ctx.geometry.num_layers();
        let pass = Pass::from(dir);
        let mut state = candidate.start_state.clone();
        let mut layer = Self::get_track_layer(candidate, dir);
        let mut misses = 0usize;
        let mut accepted = 0usize;
        let mut last_state = None;

        let end = loop {
            let Some(next) = dir.step(layer, misses + 1, num_layers) else {
                break PassEnd::DetectorEdge;
            };
            let Some(radius) = ctx.geometry.radius(next) else {
                break PassEnd::DetectorEdge;
            };

            let projection =
                match self.get_projected_coordinate(&state, &Surface::Radius(radius), dir, ctx) {
                    Ok(projection) => projection,
                    Err(err) => {
                        log::trace!(
                            "Seed {} {:?}: prediction to layer {} failed: {}",
                            candidate.seed_index,
                            dir,
                            next,
                            err
                        );
                        break PassEnd::Aborted(err);
                    }
                };

            match self.associate(candidate, &state, &projection.state, next, dir, ctx, claims) {
                Some((measurement, refined)) => match ctx.fitter.update(&refined, &measurement) {
                    Ok(updated) => {
                        log::trace!(
                            "Seed {} {:?}: layer {} accepted {:?}, chi2 = {:.3}",
                            candidate.seed_index,
                            dir,
                            next,
                            measurement.hit,
                            updated.chi2
                        );
                        candidate.accept(measurement, pass, updated.chi2);
                        state = updated.state.clone();
                        last_state = Some(updated.state);
                        layer = next;
                        misses = 0;
                        accepted += 1;
                        continue;
                    }
                    Err(err) => {
                        log::trace!(
                            "Seed {} {:?}: update on layer {} failed: {}",
                            candidate.seed_index,
                            dir,
                            next,
                            err
                        );
                    }
                },
                None => {
                    log::trace!(
                        "Seed {} {:?}: no hit on layer {}",
                        candidate.seed_index,
                        dir,
                        next
                    );
                }
            }

            misses += 1;
            if misses > self.config.max_missed_layers {
                break PassEnd::MissLimit;
            }
        };

        PassOutcome {
            dir,
            end,
            accepted,
            last_state,
        }
    }

    /// Best compatible hit on `layer`, as a measurement and the state
    /// projected onto the hit's own cylinder
    ///
    /// The window is centred on the layer prediction and widened by how far
    /// the helix drifts across the layer's radial tolerance. Each candidate is
    /// then gated against `state` projected through the hit itself, so hits
    /// off the nominal radius are compared at their true radius.
    #[allow(clippy::too_many_arguments)]
    fn associate(
        &self,
        candidate: &TrackCandidate,
        state: &TrackState,
        predicted: &TrackState,
        layer: usize,
        dir: Direction,
        ctx: &FollowContext<'_>,
        claims: Option<&HitClaims>,
    ) -> Option<(Measurement, TrackState)> {
        // Window size from a measurement at the predicted position
        let center = predicted.position();
        let nominal = self.hit_to_measurement(&center, layer).ok()?;
        let residual = ctx.fitter.residual(predicted, &nominal).ok()?;
        let margin = ctx
            .geometry
            .layer_tolerance(layer)
            .map_or(SearchWindow::new(0.0, 0.0), |dr| radial_margin(predicted, dr));
        let window = search_window(&residual.covariance, &margin, &self.config);

        let mut refined_states = Vec::new();
        let candidates: Vec<GateCandidate<'_>> = ctx
            .lookup
            .query_window(layer, &center, &window)
            .into_iter()
            .filter(|hit| !candidate.contains(hit.id))
            .filter(|hit| claims.map_or(true, |c| !c.is_claimed(hit.id)))
            .filter_map(|hit| {
                let refined = self
                    .get_projected_coordinate(state, &Surface::Point(hit.position), dir, ctx)
                    .ok()?;
                let measurement = self.hit_to_measurement(&hit.position, layer).ok()?;
                let residual = ctx.fitter.residual(&refined.state, &measurement).ok()?;
                refined_states.push((hit.id, refined.state));
                Some(GateCandidate {
                    hit,
                    chi2: residual.chi2,
                    distance: refined.distance,
                })
            })
            .collect();
        let gated = gate_candidates(candidates, self.config.chi2_cut);
        let best = select_best(&gated)?;
        let refined = refined_states
            .into_iter()
            .find_map(|(id, refined)| (id == best.hit.id).then_some(refined))?;
        let measurement = self
            .hit_to_measurement(&best.hit.position, layer)
            .ok()?
            .with_hit(best.hit.id);
        Some((measurement, refined))
    }

    // ========================================================================
    // Track completion
    // ========================================================================

    /// Classify a followed candidate by its new (non-seed) hits per pass
    fn classify(&self, candidate: &TrackCandidate) -> FollowStatus {
        let outward = candidate.new_hits(Pass::Outward);
        let inward = candidate.new_hits(Pass::Inward);
        if candidate.hits.len() < self.config.min_hits || outward + inward == 0 {
            FollowStatus::Discarded
        } else if outward > 0 && inward > 0 {
            FollowStatus::Full
        } else {
            FollowStatus::Partial
        }
    }

    /// Assemble the finished track, refitting it when enabled
    ///
    /// Returns the track and whether a requested refit failed.
    fn finish_track(
        &self,
        candidate: TrackCandidate,
        status: FollowStatus,
        outward: PassOutcome,
        inward: PassOutcome,
        ctx: &FollowContext<'_>,
    ) -> (FinishedTrack, bool) {
        let start = candidate.start_state;
        let outer_state = outward.last_state.clone().unwrap_or_else(|| start.clone());
        let inner_state = inward.last_state.clone().unwrap_or_else(|| start.clone());
        let final_state = inward.last_state.or(outward.last_state).unwrap_or(start);

        let chi2 = candidate.hits.iter().map(|h| h.chi2).sum();
        let ndf = (2 * candidate.hits.len()).saturating_sub(5);
        let mut track = FinishedTrack {
            seed_index: candidate.seed_index,
            hits: candidate.hits,
            inner_state,
            outer_state,
            final_state,
            chi2,
            ndf,
            status,
            refitted: false,
        };

        if !self.config.optimization_precise_fit {
            return (track, false);
        }
        match ctx
            .fitter
            .refit(&track.measurements_by_radius(), &track.final_state, ctx.field)
        {
            Ok(refit) => {
                track.final_state = refit.inner.clone();
                track.inner_state = refit.inner;
                track.outer_state = refit.outer;
                track.chi2 = refit.chi2;
                track.ndf = refit.ndf;
                track.refitted = true;
                (track, false)
            }
            Err(err) => {
                log::warn!(
                    "Refit of seed {} failed, keeping growth states: {}",
                    track.seed_index,
                    err
                );
                (track, true)
            }
        }
    }
}
