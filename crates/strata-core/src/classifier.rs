//! Weighted soil classifier.
//!
//! Each natural neighbour of the query point votes with its local soil
//! probabilities over the window [depth − θ, depth + θ], weighted by
//! normalized inverse planar distance (w_i = D / d_i with D = 1 / Σ 1/d_j, so
//! the weights sum to 1). The code with the largest accumulated weight wins.
//! When that code is the unclassified sentinel, the best-weighted real soil
//! code is reported instead, if any neighbour contributed one.

use serde::{Deserialize, Serialize};

use crate::borehole::{PlanarPoint, QueryPoint};
use crate::config::{ClassifierConfig, TieBreak};
use crate::error::Result;
use crate::neighbors::{DelaunayNeighbors, NeighborResolver};
use crate::probability::{IntervalOverlap, LocalProbabilityEstimator};
use crate::site::Site;
use crate::soil::SoilCode;

/// Accumulated weights closer than this are a tie.
const TIE_EPSILON: f64 = 1e-12;

/// How the reported code was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The code with the largest accumulated weight.
    MostLikely,
    /// The sentinel won; the best real soil code was reported instead.
    RunnerUp,
    /// No neighbours, no soil contributions or an invalid query; reported as null.
    Unresolvable,
}

/// Classification of one query point, with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub result: SoilCode,
    pub outcome: Outcome,
    /// Accumulated weight per code, in order of first contribution.
    pub weights: Vec<(SoilCode, f64)>,
    /// Contributing boreholes, in resolver order.
    pub neighbors: Vec<String>,
    /// The query coincided with one or more boreholes, which took all the weight.
    pub coincident: bool,
}

impl Classification {
    fn unresolvable(weights: Vec<(SoilCode, f64)>, neighbors: Vec<String>, coincident: bool) -> Self {
        Self { result: SoilCode::Unclassified, outcome: Outcome::Unresolvable, weights, neighbors, coincident }
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }

    pub fn weight_of(&self, code: SoilCode) -> f64 {
        self.weights.iter().find(|(c, _)| *c == code).map_or(0.0, |(_, w)| *w)
    }
}

/// Insertion-ordered map from code to accumulated weight.
#[derive(Debug, Clone, Default)]
struct WeightAccumulator {
    entries: Vec<(SoilCode, f64)>,
}

impl WeightAccumulator {
    fn add(&mut self, code: SoilCode, weight: f64) {
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some((_, total)) => *total += weight,
            None => self.entries.push((code, weight)),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Heaviest entry passing `accept`, ties settled by `tie_break`.
    fn best(&self, tie_break: TieBreak, accept: impl Fn(SoilCode) -> bool) -> Option<SoilCode> {
        let mut best: Option<(SoilCode, f64)> = None;
        for &(code, weight) in self.entries.iter().filter(|(c, _)| accept(*c)) {
            best = match best {
                None => Some((code, weight)),
                Some((_, top)) if weight > top + TIE_EPSILON => Some((code, weight)),
                Some((top_code, top))
                    if tie_break == TieBreak::SoilOrder
                        && (weight - top).abs() <= TIE_EPSILON
                        && code < top_code =>
                {
                    Some((code, weight))
                }
                keep => keep,
            };
        }
        best.map(|(code, _)| code)
    }
}

/// Inverse-distance weighted voting over natural neighbours.
pub struct WeightedClassifier<R = DelaunayNeighbors, E = IntervalOverlap> {
    config: ClassifierConfig,
    resolver: R,
    estimator: E,
}

impl WeightedClassifier {
    /// Classifier with the bundled Delaunay resolver and overlap estimator.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let resolver = DelaunayNeighbors::from_config(&config);
        Self::with_services(config, resolver, IntervalOverlap)
    }
}

impl<R: NeighborResolver, E: LocalProbabilityEstimator> WeightedClassifier<R, E> {
    pub fn with_services(config: ClassifierConfig, resolver: R, estimator: E) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, resolver, estimator })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify `query` and write the result onto it.
    pub fn classify_point(&self, site: &Site, query: &mut QueryPoint) -> Classification {
        let classification = self.classify(site, query);
        query.result = Some(classification.result);
        classification
    }

    /// Classify `query` without touching it.
    pub fn classify(&self, site: &Site, query: &QueryPoint) -> Classification {
        if !(query.x.is_finite() && query.y.is_finite() && query.z.is_finite()) {
            tracing::warn!(x = query.x, y = query.y, z = query.z, "non-finite query point");
            return Classification::unresolvable(Vec::new(), Vec::new(), false);
        }

        let boreholes = site.boreholes();
        let n = boreholes.len();
        let q = query.position();

        let mut points: Vec<PlanarPoint> = Vec::with_capacity(n + 1);
        points.extend(boreholes.iter().map(|b| b.position()));
        points.push(q);

        let mut neighbors = self.resolver.neighbors(&points, n);
        neighbors.retain(|&i| i < n);
        neighbors.dedup();
        let neighbor_ids: Vec<String> = neighbors.iter().map(|&i| boreholes[i].id.clone()).collect();

        if neighbors.is_empty() {
            tracing::warn!(x = query.x, y = query.y, "no neighbouring boreholes");
            return Classification::unresolvable(Vec::new(), neighbor_ids, false);
        }

        let (weights, coincident) = self.planar_weights(&points, &neighbors, q);
        if coincident {
            tracing::debug!(x = query.x, y = query.y, "query coincides with a borehole");
        }

        let theta = self.config.window_half_width;
        let mut acc = WeightAccumulator::default();
        for (&i, &w) in neighbors.iter().zip(&weights) {
            if w == 0.0 {
                continue;
            }
            let borehole = &boreholes[i];
            let depth = self.config.vertical_datum.depth_of(query.z, borehole.z);
            let proportions = match site.index().column(&borehole.id) {
                Some(column) => self.estimator.local_probabilities(column, depth - theta, depth + theta),
                None => vec![(SoilCode::Unclassified, 1.0)],
            };
            for (code, p) in proportions {
                acc.add(code, w * p);
            }
        }

        let tie_break = self.config.tie_break;
        let mle = acc.best(tie_break, |_| true);
        let (result, outcome) = match mle {
            Some(code @ SoilCode::Soil(_)) => (code, Outcome::MostLikely),
            _ if acc.len() >= 2 => match acc.best(tie_break, |c| !c.is_unclassified()) {
                Some(code) => (code, Outcome::RunnerUp),
                None => (SoilCode::Unclassified, Outcome::Unresolvable),
            },
            _ => (SoilCode::Unclassified, Outcome::Unresolvable),
        };

        tracing::debug!(
            x = query.x,
            y = query.y,
            z = query.z,
            neighbors = neighbors.len(),
            result = %result,
            ?outcome,
            "classified query point"
        );

        Classification { result, outcome, weights: acc.entries, neighbors: neighbor_ids, coincident }
    }

    /// Normalized inverse-distance weights, parallel to `neighbors`, and
    /// whether any neighbour coincides with the query.
    ///
    /// Neighbours within the coincidence tolerance share the whole weight
    /// equally; everything else then gets 0.
    fn planar_weights(&self, points: &[PlanarPoint], neighbors: &[usize], q: PlanarPoint) -> (Vec<f64>, bool) {
        let distances: Vec<f64> = neighbors.iter().map(|&i| points[i].distance(q)).collect();
        let tol = self.config.coincidence_tolerance;

        let coincident = distances.iter().filter(|&&d| d <= tol).count();
        if coincident > 0 {
            let share = 1.0 / coincident as f64;
            return (distances.iter().map(|&d| if d <= tol { share } else { 0.0 }).collect(), true);
        }

        let inverse_sum: f64 = distances.iter().map(|d| 1.0 / d).sum();
        let norm = 1.0 / inverse_sum;
        (distances.iter().map(|d| norm / d).collect(), false)
    }
}
