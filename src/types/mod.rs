//! Core types for track following
//!
//! This module provides the data model used throughout the library.
//!
//! # Types
//!
//! - [`Seed`] - Short group of hits from the seed finder
//! - [`Hit`], [`HitId`], [`Measurement`] - Hits and their local representation
//! - [`TrackState`] - Helix state with covariance on a cylinder
//! - [`TrackCandidate`], [`FinishedTrack`] - In-progress and completed tracks
//! - [`FollowerConfig`], [`FitterConfig`], [`DetectorGeometry`] - Configuration

pub mod config;
pub mod hit;
pub mod seed;
pub mod state;
pub mod track;

// Re-export all public types
pub use config::{
    ConfigSnapshot,
    DetectorGeometry,
    FitterConfig,
    FollowerConfig,
    HitSharing,
    LayerResolution,
    ResolutionModel,
    StartPoint,
};

pub use hit::{Hit, HitId, Measurement, SearchWindow};

pub use seed::{Seed, SeedPoints};

pub use state::{
    Direction,
    Projection,
    Surface,
    TrackState,
    IDX_PHI,
    IDX_PSI,
    IDX_Q_OVER_PT,
    IDX_TAN_LAMBDA,
    IDX_Z,
    STATE_DIM,
};

pub use track::{AcceptedHit, FinishedTrack, FollowStatus, Pass, TrackCandidate};
