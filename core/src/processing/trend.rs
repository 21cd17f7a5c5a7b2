use crate::prelude::{AnalysisScopeParams, Electrode, FileSequence, FrequencyHz, TrendSeries};
use crate::processing::store::ResultStore;
use std::collections::BTreeMap;

/// Dense raw peak series per configured frequency.
pub type RawTrends = BTreeMap<FrequencyHz, TrendSeries>;

/// Rebuilds dense per-frequency series from the sparse store.
pub struct TrendReconstructor;

impl TrendReconstructor {
    /// Returns `None` when nothing has been stored for `electrode` yet.
    ///
    /// Every returned series has exactly `num_files` entries; index `i`
    /// holds the usable peak of file sequence `i + 1`.
    pub fn reconstruct(
        store: &ResultStore,
        scope: &AnalysisScopeParams,
        electrode: Electrode,
    ) -> Option<RawTrends> {
        if !store.contains_electrode(electrode) {
            return None;
        }

        let trends = scope
            .frequencies
            .iter()
            .map(|&frequency| {
                let series = (1..=scope.num_files)
                    .map(|sequence| {
                        FileSequence::try_from(sequence)
                            .ok()
                            .and_then(|sequence| store.peak(electrode, frequency, sequence))
                    })
                    .collect::<TrendSeries>();
                (frequency, series)
            })
            .collect();

        Some(trends)
    }
}
