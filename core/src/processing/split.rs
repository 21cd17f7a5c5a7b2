use crate::prelude::{AnalysisScopeParams, FrequencyHz, TrendSeries, XAxisMode};
use crate::processing::derived::DerivedTrendBundle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pre/post-injection partition of an x/y series. The pivot point belongs
/// to both halves so adjoining line segments meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionSplit {
    pub before_x: Vec<f64>,
    pub before_y: TrendSeries,
    pub after_x: Vec<f64>,
    pub after_y: TrendSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentedSeries {
    Unsplit { x: Vec<f64>, y: TrendSeries },
    Split(InjectionSplit),
}

/// Injection segmentation of every series in a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedBundle {
    pub pivot: Option<f64>,
    pub raw_peak_series: BTreeMap<FrequencyHz, SegmentedSeries>,
    pub normalized_series: BTreeMap<FrequencyHz, SegmentedSeries>,
    pub differential_metric_series: SegmentedSeries,
}

pub struct InjectionSplitter;

impl InjectionSplitter {
    /// Maps a 1-based injection index onto the x axis. `None` when unset or
    /// outside `[1, num_files]`.
    pub fn resolve_pivot(
        x_axis_values: &[f64],
        injection_index: Option<usize>,
        mode: XAxisMode,
        num_files: usize,
    ) -> Option<f64> {
        let index = injection_index.filter(|&index| (1..=num_files).contains(&index))?;
        match mode {
            XAxisMode::FileNumber => Some(index as f64),
            XAxisMode::ElapsedTime => x_axis_values.get(index - 1).copied(),
        }
    }

    pub fn split(x_axis_values: &[f64], series: &[Option<f64>], pivot: Option<f64>) -> SegmentedSeries {
        let Some(pivot) = pivot else {
            return SegmentedSeries::Unsplit {
                x: x_axis_values.to_vec(),
                y: series.to_vec(),
            };
        };

        let mut split = InjectionSplit {
            before_x: Vec::new(),
            before_y: Vec::new(),
            after_x: Vec::new(),
            after_y: Vec::new(),
        };
        for (&x, &y) in x_axis_values.iter().zip(series) {
            if x <= pivot {
                split.before_x.push(x);
                split.before_y.push(y);
            }
            if x >= pivot {
                split.after_x.push(x);
                split.after_y.push(y);
            }
        }
        SegmentedSeries::Split(split)
    }

    pub fn segment_bundle(bundle: &DerivedTrendBundle, scope: &AnalysisScopeParams) -> SegmentedBundle {
        let x = &bundle.x_axis_values;
        let pivot = Self::resolve_pivot(x, scope.injection_index, scope.x_axis_mode, scope.num_files);
        let segment = |series: &BTreeMap<FrequencyHz, TrendSeries>| -> BTreeMap<FrequencyHz, SegmentedSeries> {
            series
                .iter()
                .map(|(&frequency, values)| (frequency, Self::split(x, values, pivot)))
                .collect()
        };

        SegmentedBundle {
            pivot,
            raw_peak_series: segment(&bundle.raw_peak_series),
            normalized_series: segment(&bundle.normalized_series),
            differential_metric_series: Self::split(x, &bundle.differential_metric_series, pivot),
        }
    }
}
