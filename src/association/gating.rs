//! Chi-square gating and nearest-neighbour selection
//!
//! A hit is compatible with a prediction when its squared Mahalanobis
//! distance under the residual covariance is below the gate. Among compatible
//! hits the smallest chi-square wins; near-equal chi-squares fall back to the
//! smaller Euclidean distance to the prediction, then to the smaller hit id.

use std::cmp::Ordering;

use nalgebra::DMatrix;

use crate::common::constants::{CHI2_TIE_TOLERANCE, MIN_CROSSING_COSINE};
use crate::types::{FollowerConfig, Hit, SearchWindow, TrackState};

/// A hit that passed the gate
#[derive(Debug, Clone, Copy)]
pub struct GateCandidate<'h> {
    /// The hit
    pub hit: &'h Hit,
    /// Squared Mahalanobis distance to the prediction
    pub chi2: f64,
    /// Euclidean distance to the predicted position (cm)
    pub distance: f64,
}

/// Lookup window around a prediction with residual covariance `s`
///
/// Half-widths are `window_sigmas` standard deviations of `[r·φ, z]` plus
/// `margin`, clamped to the configured bounds.
pub fn search_window(
    s: &DMatrix<f64>,
    margin: &SearchWindow,
    config: &FollowerConfig,
) -> SearchWindow {
    let half_rphi = (config.window_sigmas * s[(0, 0)].max(0.0).sqrt() + margin.half_rphi)
        .clamp(config.min_window_rphi, config.max_window_rphi);
    let half_z = (config.window_sigmas * s[(1, 1)].max(0.0).sqrt() + margin.half_z)
        .clamp(config.min_window_z, config.max_window_z);
    SearchWindow::new(half_rphi, half_z)
}

/// Drift of a predicted crossing over a radial offset `dr`
///
/// A hit up to `dr` off the nominal layer radius sits where the track crosses
/// its own cylinder, displaced along the arc by `dr·|tan α|` and along z by
/// `dr·|tanλ| / |cos α|`, with α the angle between the momentum and the
/// radial direction.
pub fn radial_margin(predicted: &TrackState, dr: f64) -> SearchWindow {
    let alpha = predicted.psi() - predicted.phi();
    let cos_alpha = alpha.cos().abs().max(MIN_CROSSING_COSINE);
    let sin_alpha = alpha.sin().abs();
    let dr = dr.abs();
    SearchWindow::new(
        dr * sin_alpha / cos_alpha,
        dr * predicted.tan_lambda().abs() / cos_alpha,
    )
}

/// Keep candidates inside the gate, best first
pub fn gate_candidates<'h>(
    candidates: impl IntoIterator<Item = GateCandidate<'h>>,
    chi2_cut: f64,
) -> Vec<GateCandidate<'h>> {
    let mut gated: Vec<GateCandidate<'h>> = candidates
        .into_iter()
        .filter(|c| c.chi2.is_finite() && c.chi2 <= chi2_cut)
        .collect();
    gated.sort_by(|a, b| {
        a.chi2
            .total_cmp(&b.chi2)
            .then(a.distance.total_cmp(&b.distance))
            .then(a.hit.id.cmp(&b.hit.id))
    });
    gated
}

/// Select the best gated candidate
///
/// `gated` must be ordered as returned by [`gate_candidates`].
pub fn select_best<'h>(gated: &[GateCandidate<'h>]) -> Option<GateCandidate<'h>> {
    let best = gated.first()?;
    gated
        .iter()
        .take_while(|c| c.chi2 - best.chi2 <= CHI2_TIE_TOLERANCE)
        .min_by(|a, b| match a.distance.total_cmp(&b.distance) {
            Ordering::Equal => a.hit.id.cmp(&b.hit.id),
            other => other,
        })
        .copied()
}
