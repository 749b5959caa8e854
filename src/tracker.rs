//! Per-event tracking driver
//!
//! [`Tracker`] owns the long-lived pieces of a tracking run (geometry, fit
//! engine, follower, hit lookup) and drives one event at a time: resolve the
//! field once, index the event's hits, follow all seeds, clear the lookup and
//! report throughput.

use std::time::{Duration, Instant};

use nalgebra::Point3;

use crate::association::LayeredHitLookup;
use crate::components::HelixKalmanFitter;
use crate::field::{FieldSource, UniformField};
use crate::follower::{
    FieldModel, FollowContext, FollowStats, HitLookup, TrackFollower, TrackingError,
};
use crate::types::{
    ConfigSnapshot, DetectorGeometry, FinishedTrack, FitterConfig, FollowerConfig, Seed,
};

/// Run-level tracker configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerConfig {
    /// Follower configuration
    pub follower: FollowerConfig,
    /// Fit engine configuration
    pub fitter: FitterConfig,
    /// Refuse to run without a field map instead of using the default field
    pub require_field_map: bool,
}

impl TrackerConfig {
    /// Set the follower configuration
    pub fn with_follower(mut self, follower: FollowerConfig) -> Self {
        self.follower = follower;
        self
    }

    /// Set the fit engine configuration
    pub fn with_fitter(mut self, fitter: FitterConfig) -> Self {
        self.fitter = fitter;
        self
    }

    /// Require a field map
    pub fn with_require_field_map(mut self, require: bool) -> Self {
        self.require_field_map = require;
        self
    }
}

/// Output of one event
#[derive(Debug, Clone)]
pub struct EventResult {
    /// Finished tracks in seed order
    pub tracks: Vec<FinishedTrack>,
    /// Follow counters
    pub stats: FollowStats,
    /// Wall time of the follow pass
    pub elapsed: Duration,
    /// Tracks per second of wall time
    pub tracks_per_second: f64,
    /// Nominal field the event was tracked with (T)
    pub bz: f64,
}

/// Event-by-event tracking driver
pub struct Tracker {
    follower: TrackFollower,
    fitter: HelixKalmanFitter,
    require_field_map: bool,
    geometry: Option<DetectorGeometry>,
    lookup: Option<LayeredHitLookup>,
    field_map: Option<Box<dyn FieldModel>>,
    field: Option<(FieldSource, UniformField)>,
}

impl Tracker {
    /// Create a tracker
    pub fn new(config: TrackerConfig) -> Result<Self, TrackingError> {
        Ok(Self {
            follower: TrackFollower::new(config.follower)?,
            fitter: HelixKalmanFitter::new(config.fitter)?,
            require_field_map: config.require_field_map,
            geometry: None,
            lookup: None,
            field_map: None,
            field: None,
        })
    }

    /// Set the detector geometry
    pub fn with_geometry(mut self, geometry: DetectorGeometry) -> Self {
        self.lookup = Some(LayeredHitLookup::new(geometry.clone()));
        self.geometry = Some(geometry);
        self
    }

    /// Supply a field map; its value at the origin becomes the nominal field
    pub fn with_field_map(mut self, field_map: Box<dyn FieldModel>) -> Self {
        self.field_map = Some(field_map);
        self.field = None;
        self
    }

    /// Forward the helix seeding switch to the follower
    pub fn set_track_follower_optimization_helix(&mut self, opt: bool) {
        self.follower.set_optimization_helix(opt);
    }

    /// Forward the precise refit switch to the follower
    pub fn set_track_follower_optimization_precise_fit(&mut self, opt: bool) {
        self.follower.set_optimization_precise_fit(opt);
    }

    /// Follower in use
    pub fn follower(&self) -> &TrackFollower {
        &self.follower
    }

    /// Effective configuration, once a geometry is set
    pub fn snapshot(&self) -> Option<ConfigSnapshot> {
        Some(ConfigSnapshot {
            follower: self.follower.config().clone(),
            fitter: self.fitter.config().clone(),
            geometry: self.geometry.clone()?,
        })
    }

    /// Track one event
    ///
    /// # Errors
    /// `MissingGeometry` without a geometry, `MissingField` when a field map
    /// is required but absent or unusable, and any fatal follow error. The
    /// hit lookup is cleared in every case.
    pub fn process_event(
        &mut self,
        hits: &[Point3<f64>],
        seeds: &[Seed],
    ) -> Result<EventResult, TrackingError> {
        log::info!("---- process event started ----");

        let (source, field) = self.resolve_field()?;
        let (Some(geometry), Some(lookup)) = (self.geometry.as_ref(), self.lookup.as_mut()) else {
            log::error!("No detector geometry, track propagation will fail");
            return Err(TrackingError::MissingGeometry);
        };

        let start = Instant::now();
        log::info!("Received {} track seeds", seeds.len());

        lookup.init(hits);
        let ctx = FollowContext::new(&field, geometry, &*lookup, &self.fitter);
        let result = self.follower.follow_tracks(seeds, &ctx);
        lookup.clear();
        let output = result?;

        let elapsed = start.elapsed();
        let seconds = elapsed.as_secs_f64();
        let tracks_per_second = if seconds > 0.0 {
            output.tracks.len() as f64 / seconds
        } else {
            0.0
        };
        log::info!("TrackFollower reconstructed {} tracks", output.tracks.len());
        log::info!(
            "Track following took {:.3} seconds, {:.1} tracks per second",
            seconds,
            tracks_per_second
        );
        log::info!("---- process event finished ----");

        Ok(EventResult {
            tracks: output.tracks,
            stats: output.stats,
            elapsed,
            tracks_per_second,
            bz: source.bz(),
        })
    }

    /// Nominal field, resolved on first use
    fn resolve_field(&mut self) -> Result<(FieldSource, UniformField), TrackingError> {
        if let Some(resolved) = self.field {
            return Ok(resolved);
        }
        let source = FieldSource::resolve(self.field_map.as_deref(), self.require_field_map)?;
        let resolved = (source, source.uniform());
        self.field = Some(resolved);
        Ok(resolved)
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("follower", &self.follower)
            .field("fitter", &self.fitter)
            .field("geometry", &self.geometry)
            .field("field_map", &self.field_map.as_ref().map(|m| m.name()))
            .field("field", &self.field)
            .finish()
    }
}
