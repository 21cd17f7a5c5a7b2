use crate::math::stats::StatsHelper;
use crate::prelude::{AnalysisScopeParams, FrequencyHz, KdmFormula, TrendSeries, XAxisMode};
use crate::processing::trend::RawTrends;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the renderer needs for one electrode. Rebuilt wholesale on
/// every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedTrendBundle {
    pub x_axis_values: Vec<f64>,
    pub raw_peak_series: BTreeMap<FrequencyHz, TrendSeries>,
    pub normalized_series: BTreeMap<FrequencyHz, TrendSeries>,
    pub differential_metric_series: TrendSeries,
}

pub struct DerivedMetricCalculator;

impl DerivedMetricCalculator {
    pub fn compute(
        raw: &RawTrends,
        scope: &AnalysisScopeParams,
        time_axis: Option<&[f64]>,
    ) -> DerivedTrendBundle {
        let num_files = scope.num_files;
        let raw_peak_series: BTreeMap<FrequencyHz, TrendSeries> = scope
            .frequencies
            .iter()
            .map(|&frequency| {
                let mut series = raw.get(&frequency).cloned().unwrap_or_default();
                series.resize(num_files, None);
                (frequency, series)
            })
            .collect();

        let normalized_series = raw_peak_series
            .iter()
            .map(|(&frequency, series)| {
                let factor = Self::normalization_factor(series, scope.normalization_index);
                let normalized = series
                    .iter()
                    .map(|value| value.and_then(|v| StatsHelper::finite(v / factor)))
                    .collect();
                (frequency, normalized)
            })
            .collect::<BTreeMap<_, TrendSeries>>();

        let differential_metric_series =
            Self::differential_metric(scope, &raw_peak_series, &normalized_series);

        DerivedTrendBundle {
            x_axis_values: Self::x_axis_values(scope, time_axis),
            raw_peak_series,
            normalized_series,
            differential_metric_series,
        }
    }

    /// File numbers `1..=n`, or elapsed minutes. A supplied timebase of
    /// matching length wins over `i * sample_rate / 60`.
    pub fn x_axis_values(scope: &AnalysisScopeParams, time_axis: Option<&[f64]>) -> Vec<f64> {
        let num_files = scope.num_files;
        match scope.x_axis_mode {
            XAxisMode::FileNumber => (1..=num_files).map(|n| n as f64).collect(),
            XAxisMode::ElapsedTime => match time_axis {
                Some(axis) if axis.len() == num_files => axis.to_vec(),
                _ => (0..num_files)
                    .map(|i| i as f64 * scope.sample_rate_seconds / 60.0)
                    .collect(),
            },
        }
    }

    /// Value at the 1-based normalization index, or a neutral 1.0.
    pub fn normalization_factor(series: &[Option<f64>], normalization_index: usize) -> f64 {
        let sample = normalization_index
            .checked_sub(1)
            .and_then(|index| series.get(index).copied().flatten());
        StatsHelper::neutral_factor(sample)
    }

    fn differential_metric(
        scope: &AnalysisScopeParams,
        raw: &BTreeMap<FrequencyHz, TrendSeries>,
        normalized: &BTreeMap<FrequencyHz, TrendSeries>,
    ) -> TrendSeries {
        let num_files = scope.num_files;
        let (Some(low), Some(high)) = (scope.low_frequency(), scope.high_frequency()) else {
            return vec![None; num_files];
        };
        let source = match scope.kdm_formula {
            KdmFormula::NormalizedDifference => normalized,
            KdmFormula::RawRatio => raw,
        };
        let at = |frequency: FrequencyHz, index: usize| {
            source
                .get(&frequency)
                .and_then(|series| series.get(index).copied().flatten())
        };

        (0..num_files)
            .map(|i| match scope.kdm_formula {
                KdmFormula::NormalizedDifference => {
                    StatsHelper::difference(at(high, i), at(low, i)).map(|d| (d + 1.0) * 100.0)
                }
                KdmFormula::RawRatio => StatsHelper::ratio(at(low, i), at(high, i)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(num_files: usize) -> AnalysisScopeParams {
        AnalysisScopeParams::new(num_files, [10, 100])
    }

    fn raw(low: TrendSeries, high: TrendSeries) -> RawTrends {
        BTreeMap::from([(10, low), (100, high)])
    }

    #[test]
    fn normalizes_against_selected_file() {
        let bundle = DerivedMetricCalculator::compute(
            &raw(vec![Some(2.0), Some(4.0), Some(6.0)], vec![None; 3]),
            &scope(3),
            None,
        );
        assert_eq!(bundle.normalized_series[&10], vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn missing_or_zero_normalization_sample_is_neutral() {
        let mut params = scope(3);
        params.normalization_index = 2;
        let bundle = DerivedMetricCalculator::compute(
            &raw(vec![Some(2.0), None, Some(6.0)], vec![Some(3.0), Some(0.0), Some(9.0)]),
            &params,
            None,
        );
        assert_eq!(bundle.normalized_series[&10], vec![Some(2.0), None, Some(6.0)]);
        assert_eq!(bundle.normalized_series[&100], vec![Some(3.0), Some(0.0), Some(9.0)]);

        params.normalization_index = 0;
        let bundle = DerivedMetricCalculator::compute(
            &raw(vec![Some(2.0), None, None], vec![None; 3]),
            &params,
            None,
        );
        assert_eq!(bundle.normalized_series[&10][0], Some(2.0));
    }

    #[test]
    fn kdm_uses_normalized_difference() {
        let bundle = DerivedMetricCalculator::compute(
            &raw(vec![Some(2.0), Some(2.0)], vec![Some(4.0), Some(6.0)]),
            &scope(2),
            None,
        );
        // normalized low [1.0, 1.0], high [1.0, 1.5]
        assert_eq!(bundle.differential_metric_series, vec![Some(100.0), Some(150.0)]);
    }

    #[test]
    fn kdm_is_null_where_either_input_is_missing() {
        let bundle = DerivedMetricCalculator::compute(
            &raw(vec![Some(1.0), None, Some(1.0)], vec![Some(1.0), Some(1.0), None]),
            &scope(3),
            None,
        );
        assert_eq!(bundle.differential_metric_series, vec![Some(100.0), None, None]);
    }

    #[test]
    fn raw_ratio_formula_divides_low_by_high() {
        let mut params = scope(2);
        params.kdm_formula = KdmFormula::RawRatio;
        let bundle = DerivedMetricCalculator::compute(
            &raw(vec![Some(3.0), Some(1.0)], vec![Some(1.5), Some(0.0)]),
            &params,
            None,
        );
        assert_eq!(bundle.differential_metric_series, vec![Some(2.0), None]);
    }

    #[test]
    fn elapsed_time_axis_prefers_matching_timebase() {
        let mut params = scope(3);
        params.x_axis_mode = XAxisMode::ElapsedTime;
        params.sample_rate_seconds = 30.0;
        assert_eq!(
            DerivedMetricCalculator::x_axis_values(&params, None),
            vec![0.0, 0.5, 1.0]
        );
        assert_eq!(
            DerivedMetricCalculator::x_axis_values(&params, Some(&[0.0, 0.7, 1.9])),
            vec![0.0, 0.7, 1.9]
        );
        assert_eq!(
            DerivedMetricCalculator::x_axis_values(&params, Some(&[0.0, 0.7])),
            vec![0.0, 0.5, 1.0]
        );
    }

    #[test]
    fn file_number_axis_is_one_based() {
        assert_eq!(
            DerivedMetricCalculator::x_axis_values(&scope(3), None),
            vec![1.0, 2.0, 3.0]
        );
    }
}
