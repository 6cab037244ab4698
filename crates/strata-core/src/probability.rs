//! Local soil probabilities of one borehole over a depth window.

use crate::index::BoreholeColumn;
use crate::soil::SoilCode;

/// Describes how a depth window `[low, high]` of one borehole is occupied.
///
/// Implementations return `(code, proportion)` pairs with distinct codes and
/// proportions summing to 1. Window portions outside the logged depth range
/// belong to `SoilCode::Unclassified`. The order of the pairs is significant:
/// it is the contribution order seen by the classifier's tie-break.
pub trait LocalProbabilityEstimator: Sync {
    fn local_probabilities(&self, column: &BoreholeColumn, low: f64, high: f64) -> Vec<(SoilCode, f64)>;
}

/// Occupancy by overlap length, walking the window from shallow to deep.
///
/// A zero-width window degenerates to a point lookup with proportion 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalOverlap;

impl LocalProbabilityEstimator for IntervalOverlap {
    fn local_probabilities(&self, column: &BoreholeColumn, low: f64, high: f64) -> Vec<(SoilCode, f64)> {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let width = high - low;

        if column.domains.is_empty() {
            return vec![(SoilCode::Unclassified, 1.0)];
        }
        if width <= 0.0 {
            let code = column.soil_at(low).map_or(SoilCode::Unclassified, SoilCode::Soil);
            return vec![(code, 1.0)];
        }

        let mut occupancy: Vec<(SoilCode, f64)> = Vec::new();
        let mut add = |code: SoilCode, length: f64| {
            if length <= 0.0 {
                return;
            }
            match occupancy.iter_mut().find(|(c, _)| *c == code) {
                Some((_, total)) => *total += length,
                None => occupancy.push((code, length)),
            }
        };

        let top = column.top_depth();
        let bottom = column.bottom_depth();

        add(SoilCode::Unclassified, high.min(top) - low);
        for (layer_top, layer_base, soil) in column.layers() {
            add(SoilCode::Soil(soil), high.min(layer_base) - low.max(layer_top));
        }
        add(SoilCode::Unclassified, high - low.max(bottom));

        for (_, length) in &mut occupancy {
            *length /= width;
        }
        occupancy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::StratigraphicNode;
    use crate::soil::SoilId;
    use approx::assert_relative_eq;

    fn soil(c: char) -> SoilCode {
        SoilCode::Soil(SoilId::try_from(c).unwrap())
    }

    /// 'A' over 0–2 m, 'B' over 2–5 m, 'A' again over 5–6 m.
    fn column() -> BoreholeColumn {
        let depths = [0.0, 2.0, 5.0, 6.0];
        BoreholeColumn {
            borehole_id: "ZK1".into(),
            collar_z: 0.0,
            nodes: depths
                .iter()
                .enumerate()
                .map(|(i, &depth)| StratigraphicNode { id: i as u64, depth })
                .collect(),
            domains: "ABA".chars().map(|c| SoilId::try_from(c).unwrap()).collect(),
        }
    }

    fn total(p: &[(SoilCode, f64)]) -> f64 {
        p.iter().map(|(_, v)| v).sum()
    }

    #[test]
    fn window_inside_one_layer() {
        let p = IntervalOverlap.local_probabilities(&column(), 3.0, 4.0);
        assert_eq!(p, vec![(soil('B'), 1.0)]);
    }

    #[test]
    fn window_across_interface_splits_by_length() {
        let p = IntervalOverlap.local_probabilities(&column(), 1.5, 2.5);
        assert_eq!(p.len(), 2);
        assert_eq!(p[0].0, soil('A'));
        assert_relative_eq!(p[0].1, 0.5);
        assert_relative_eq!(p[1].1, 0.5);
    }

    #[test]
    fn repeated_soil_is_merged_at_first_position() {
        let p = IntervalOverlap.local_probabilities(&column(), 1.0, 6.0);
        assert_eq!(p.len(), 2);
        assert_eq!(p[0].0, soil('A'));
        assert_relative_eq!(p[0].1, 2.0 / 5.0);
        assert_relative_eq!(p[1].1, 3.0 / 5.0);
    }

    #[test]
    fn window_below_log_is_unclassified() {
        let p = IntervalOverlap.local_probabilities(&column(), 10.0, 11.0);
        assert_eq!(p, vec![(SoilCode::Unclassified, 1.0)]);
    }

    #[test]
    fn window_straddling_bottom_is_partly_unclassified() {
        let p = IntervalOverlap.local_probabilities(&column(), 5.5, 6.5);
        assert_eq!(p[0].0, soil('A'));
        assert_relative_eq!(p[0].1, 0.5);
        assert_eq!(p[1].0, SoilCode::Unclassified);
        assert_relative_eq!(p[1].1, 0.5);
    }

    #[test]
    fn window_above_collar_puts_unclassified_first() {
        let p = IntervalOverlap.local_probabilities(&column(), -0.5, 0.5);
        assert_eq!(p[0].0, SoilCode::Unclassified);
        assert_relative_eq!(total(&p), 1.0);
    }

    #[test]
    fn zero_width_window_is_a_point_lookup() {
        assert_eq!(IntervalOverlap.local_probabilities(&column(), 2.0, 2.0), vec![(soil('B'), 1.0)]);
        assert_eq!(
            IntervalOverlap.local_probabilities(&column(), 7.0, 7.0),
            vec![(SoilCode::Unclassified, 1.0)]
        );
    }

    #[test]
    fn reversed_bounds_are_accepted() {
        let a = IntervalOverlap.local_probabilities(&column(), 1.5, 2.5);
        let b = IntervalOverlap.local_probabilities(&column(), 2.5, 1.5);
        assert_eq!(a, b);
    }

    #[test]
    fn proportions_always_sum_to_one() {
        let col = column();
        for i in -20..80 {
            let low = i as f64 * 0.1;
            for width in [0.1, 0.7, 3.0, 12.0] {
                let p = IntervalOverlap.local_probabilities(&col, low, low + width);
                assert_relative_eq!(total(&p), 1.0, epsilon = 1e-9);
            }
        }
    }
}
