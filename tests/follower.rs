//! Track follower integration tests.
//!
//! End-to-end following of generated events: hit coverage, gaps, seed
//! rejection, pass ordering, refitting and hit sharing.

#[path = "follower/helpers.rs"]
mod helpers;

#[path = "follower/properties.rs"]
mod properties;

#[path = "follower/refit.rs"]
mod refit;

#[path = "follower/hit_sharing.rs"]
mod hit_sharing;
