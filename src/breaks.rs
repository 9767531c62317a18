//! Class breaks over a numeric feature property.

use geojson::FeatureCollection;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakMode {
    #[default]
    EqualInterval,
    Quantile,
    Logarithmic,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BreakError {
    #[error("no numeric values to classify")]
    Empty,
    #[error("at least 2 breaks are needed, {0} requested")]
    TooFewBreaks(usize),
    #[error("logarithmic breaks need strictly positive values, minimum is {0}")]
    NonPositive(f64),
}

/// Ascending thresholds; the first is the data minimum and the last the
/// data maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakSet(Vec<f64>);

impl BreakSet {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.0[0]
    }

    pub fn max(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

/// Finite numeric values of `property`. Features without the property, or
/// with a non-numeric value, are skipped.
pub fn elevation_values(fc: &FeatureCollection, property: &str) -> Vec<f64> {
    fc.features
        .iter()
        .filter_map(|f| f.property(property))
        .filter_map(|v| v.as_f64())
        .filter(|v| v.is_finite())
        .collect()
}

pub fn compute_breaks(
    values: &[f64],
    count: usize,
    mode: BreakMode,
) -> Result<BreakSet, BreakError> {
    if count < 2 {
        return Err(BreakError::TooFewBreaks(count));
    }

    let (min, max) = match values.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => return Err(BreakError::Empty),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };

    let classes = (count - 1) as f64;
    let mut limits = Vec::with_capacity(count);
    limits.push(min);

    match mode {
        BreakMode::EqualInterval => {
            for i in 1..count - 1 {
                limits.push(min + (i as f64 / classes) * (max - min));
            }
        }
        BreakMode::Quantile => {
            let sorted = values
                .iter()
                .copied()
                .sorted_by(|a, b| a.total_cmp(b))
                .collect_vec();
            for i in 1..count - 1 {
                let p = (sorted.len() - 1) as f64 * i as f64 / classes;
                let lower = p.floor() as usize;
                let fraction = p - lower as f64;
                if fraction == 0.0 {
                    limits.push(sorted[lower]);
                } else {
                    limits.push(sorted[lower] * (1.0 - fraction) + sorted[lower + 1] * fraction);
                }
            }
        }
        BreakMode::Logarithmic => {
            if min <= 0.0 {
                return Err(BreakError::NonPositive(min));
            }
            let (log_min, log_max) = (min.log10(), max.log10());
            for i in 1..count - 1 {
                limits.push(10f64.powf(log_min + (i as f64 / classes) * (log_max - log_min)));
            }
        }
    }

    limits.push(max);
    Ok(BreakSet(limits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_io::feature_collection;
    use geojson::Feature;
    use serde_json::json;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len(), "{:?} vs {:?}", a, b);
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_equal_interval_nine_breaks() {
        let values = [2400.0, 2600.0, 2500.0, 2560.0];
        let breaks = compute_breaks(&values, 9, BreakMode::EqualInterval).unwrap();
        assert_eq!(breaks.len(), 9);
        assert_close(
            breaks.values(),
            &[2400.0, 2425.0, 2450.0, 2475.0, 2500.0, 2525.0, 2550.0, 2575.0, 2600.0],
        );
        assert_eq!(breaks.min(), 2400.0);
        assert_eq!(breaks.max(), 2600.0);
    }

    #[test]
    fn test_constant_values() {
        let breaks = compute_breaks(&[7.0, 7.0], 4, BreakMode::EqualInterval).unwrap();
        assert_eq!(breaks.values(), &[7.0, 7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_quantile_breaks() {
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        let breaks = compute_breaks(&values, 3, BreakMode::Quantile).unwrap();
        assert_close(breaks.values(), &[1.0, 3.0, 100.0]);

        let breaks = compute_breaks(&values, 4, BreakMode::Quantile).unwrap();
        assert_close(breaks.values(), &[1.0, 2.0 + 1.0 / 3.0, 3.0 + 2.0 / 3.0, 100.0]);
    }

    #[test]
    fn test_logarithmic_breaks() {
        let breaks = compute_breaks(&[1.0, 1000.0], 4, BreakMode::Logarithmic).unwrap();
        assert_close(breaks.values(), &[1.0, 10.0, 100.0, 1000.0]);
        assert_eq!(
            compute_breaks(&[0.0, 10.0], 4, BreakMode::Logarithmic),
            Err(BreakError::NonPositive(0.0))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            compute_breaks(&[], 9, BreakMode::EqualInterval),
            Err(BreakError::Empty)
        );
        assert_eq!(
            compute_breaks(&[1.0], 1, BreakMode::EqualInterval),
            Err(BreakError::TooFewBreaks(1))
        );
    }

    #[test]
    fn test_elevation_values_skip_missing_and_text() {
        let feature = |props: serde_json::Value| Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        };
        let fc = feature_collection(vec![
            feature(json!({"elevation": 2500})),
            feature(json!({"elevation": "high"})),
            feature(json!({"name": "no elevation"})),
            feature(json!({"elevation": 0.0})),
            feature(json!({"elevation": 2612.5})),
        ]);
        assert_eq!(elevation_values(&fc, "elevation"), vec![2500.0, 0.0, 2612.5]);
    }
}
