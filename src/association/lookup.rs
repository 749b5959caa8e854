//! Layered hit lookup
//!
//! Hits of one event are assigned to the nearest detector layer and kept per
//! layer sorted by azimuth. A window query is then two binary searches on the
//! azimuth range (split in two when it crosses `±π`) plus a cut on `z`.

use std::f64::consts::{PI, TAU};

use nalgebra::Point3;

use crate::follower::traits::HitLookup;
use crate::types::{DetectorGeometry, Hit, HitId, SearchWindow};

/// Hit index keyed by layer and azimuth
#[derive(Debug, Clone)]
pub struct LayeredHitLookup {
    geometry: DetectorGeometry,
    /// Arena indexed by [`HitId`]; `None` for hits off every layer
    hits: Vec<Option<Hit>>,
    /// Per layer: `(φ, id)` sorted by φ
    layers: Vec<Vec<(f64, HitId)>>,
    len: usize,
}

impl LayeredHitLookup {
    /// Create an empty lookup for a detector
    pub fn new(geometry: DetectorGeometry) -> Self {
        let layers = vec![Vec::new(); geometry.num_layers()];
        Self {
            geometry,
            hits: Vec::new(),
            layers,
            len: 0,
        }
    }

    /// Detector geometry the lookup assigns layers with
    pub fn geometry(&self) -> &DetectorGeometry {
        &self.geometry
    }

    /// Number of hits on one layer
    pub fn layer_len(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, Vec::len)
    }

    /// Collect hits of `layer` with φ in `[lo, hi]` and |Δz| within the window
    fn collect_range<'a>(
        &'a self,
        layer: &[(f64, HitId)],
        lo: f64,
        hi: f64,
        z: f64,
        half_z: f64,
        out: &mut Vec<&'a Hit>,
    ) {
        let start = layer.partition_point(|(phi, _)| *phi < lo);
        let end = layer.partition_point(|(phi, _)| *phi <= hi);
        if start >= end {
            return;
        }
        out.extend(
            layer[start..end]
                .iter()
                .filter_map(|(_, id)| self.hit(*id))
                .filter(|hit| (hit.position.z - z).abs() <= half_z),
        );
    }
}

impl HitLookup for LayeredHitLookup {
    fn init(&mut self, positions: &[Point3<f64>]) {
        self.clear();
        self.hits.reserve(positions.len());

        let mut off_layer = 0usize;
        let mut non_finite = 0usize;
        for (index, position) in positions.iter().enumerate() {
            let id = HitId(index);
            if !position.coords.iter().all(|c| c.is_finite()) {
                non_finite += 1;
                self.hits.push(None);
                continue;
            }
            let Some(layer) = self.geometry.layer_of(position.x.hypot(position.y)) else {
                off_layer += 1;
                self.hits.push(None);
                continue;
            };
            let hit = Hit::new(id, *position, layer);
            self.layers[layer].push((hit.phi(), id));
            self.hits.push(Some(hit));
            self.len += 1;
        }

        for layer in &mut self.layers {
            layer.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        }

        if off_layer > 0 || non_finite > 0 {
            log::debug!(
                "Hit lookup ignored {} off-layer and {} non-finite hits of {}",
                off_layer,
                non_finite,
                positions.len()
            );
        }
    }

    fn query_window(
        &self,
        layer: usize,
        center: &Point3<f64>,
        window: &SearchWindow,
    ) -> Vec<&Hit> {
        let (Some(hits), Some(radius)) = (self.layers.get(layer), self.geometry.radius(layer))
        else {
            return Vec::new();
        };
        let mut found = Vec::new();
        if hits.is_empty() {
            return found;
        }

        let half_phi = window.half_rphi / radius;
        let (z, half_z) = (center.z, window.half_z);

        if !(half_phi < PI) {
            self.collect_range(hits, -PI, PI, z, half_z, &mut found);
            return found;
        }

        let phi = center.y.atan2(center.x);
        let (lo, hi) = (phi - half_phi, phi + half_phi);
        if lo < -PI {
            self.collect_range(hits, lo + TAU, PI, z, half_z, &mut found);
            self.collect_range(hits, -PI, hi, z, half_z, &mut found);
        } else if hi > PI {
            self.collect_range(hits, lo, PI, z, half_z, &mut found);
            self.collect_range(hits, -PI, hi - TAU, z, half_z, &mut found);
        } else {
            self.collect_range(hits, lo, hi, z, half_z, &mut found);
        }
        found
    }

    fn hit(&self, id: HitId) -> Option<&Hit> {
        self.hits.get(id.index())?.as_ref()
    }

    fn locate(&self, point: &Point3<f64>, tolerance: f64) -> Option<&Hit> {
        let layer = self.geometry.layer_of(point.x.hypot(point.y))?;
        self.query_window(layer, point, &SearchWindow::exact(tolerance))
            .into_iter()
            .map(|hit| (nalgebra::distance(&hit.position, point), hit))
            .filter(|(d, _)| *d <= tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, hit)| hit)
    }

    fn clear(&mut self) {
        self.hits.clear();
        for layer in &mut self.layers {
            layer.clear();
        }
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }

    fn id_bound(&self) -> usize {
        self.hits.len()
    }
}
