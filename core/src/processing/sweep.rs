use crate::interface::MeasurementResult;
use crate::prelude::{AnalysisScopeParams, Electrode, FrequencyHz, TrendError, TrendResult};
use crate::processing::store::{InsertPolicy, ResultStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Charge per frequency, per electrode.
pub type ChargeMap = BTreeMap<Electrode, BTreeMap<FrequencyHz, Option<f64>>>;

/// What the sweep plot shows for one electrode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "frequency", rename_all = "snake_case")]
pub enum SweepDisplay {
    Empty,
    Latest(FrequencyHz),
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargePoint {
    pub frequency: FrequencyHz,
    pub charge: Option<f64>,
}

/// Progress after recording one sweep result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProgress {
    pub electrode: Electrode,
    pub frequency: FrequencyHz,
    pub analyzed: usize,
    pub expected: usize,
    pub electrode_complete: bool,
    pub sweep_complete: bool,
}

/// Live per-electrode, per-frequency sweep state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepAggregator {
    store: ResultStore,
    latest: BTreeMap<Electrode, FrequencyHz>,
    overlay: BTreeSet<Electrode>,
}

impl SweepAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one analyzed frequency. A frequency already analyzed for the
    /// electrode in this sweep is rejected and the stored value kept; a
    /// failed analysis only shows as latest and can be resent.
    pub fn record(
        &mut self,
        result: MeasurementResult,
        scope: &AnalysisScopeParams,
    ) -> TrendResult<SweepProgress> {
        let electrode = result.electrode();
        let frequency = result.frequency();
        if !scope.frequencies.contains(&frequency) {
            return Err(TrendError::FrequencyOutOfScope(frequency));
        }

        self.store.insert(result, InsertPolicy::RejectDuplicate)?;
        self.latest.insert(electrode, frequency);

        let electrode_complete = self.is_electrode_complete(electrode, scope);
        if electrode_complete {
            self.overlay.insert(electrode);
        }

        Ok(SweepProgress {
            electrode,
            frequency,
            analyzed: self.analyzed_frequencies(electrode).len(),
            expected: scope.frequencies.len(),
            electrode_complete,
            sweep_complete: self.is_complete(scope),
        })
    }

    /// Frequencies with a usable analysis for `electrode`.
    pub fn analyzed_frequencies(&self, electrode: Electrode) -> BTreeSet<FrequencyHz> {
        self.store
            .results_for(electrode)
            .filter(|result| result.payload().status.is_ok())
            .map(MeasurementResult::frequency)
            .collect()
    }

    pub fn is_electrode_complete(&self, electrode: Electrode, scope: &AnalysisScopeParams) -> bool {
        self.analyzed_frequencies(electrode).len() == scope.frequencies.len()
    }

    pub fn is_complete(&self, scope: &AnalysisScopeParams) -> bool {
        scope
            .target_electrodes()
            .into_iter()
            .all(|electrode| self.is_electrode_complete(electrode, scope))
    }

    /// Overlay, once reached, sticks until the live map is reset.
    pub fn display(&self, electrode: Electrode) -> SweepDisplay {
        if self.overlay.contains(&electrode) {
            SweepDisplay::Overlay
        } else {
            self.latest
                .get(&electrode)
                .map_or(SweepDisplay::Empty, |&frequency| SweepDisplay::Latest(frequency))
        }
    }

    pub fn latest_result(&self, electrode: Electrode) -> Option<&MeasurementResult> {
        self.latest.get(&electrode).and_then(|&frequency| {
            self.store
                .results_for(electrode)
                .find(|result| result.frequency() == frequency)
        })
    }

    /// Results for one electrode, ascending by frequency.
    pub fn results_for(&self, electrode: Electrode) -> Vec<MeasurementResult> {
        self.store.results_for(electrode).cloned().collect()
    }

    /// Charge-vs-frequency, ascending by frequency whatever the arrival order.
    pub fn charge_series(&self, electrode: Electrode) -> Vec<ChargePoint> {
        charge_series_of(&self.store, electrode)
    }

    pub fn charge_map(&self) -> ChargeMap {
        charge_map_of(&self.store)
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Hands the recorded results over and starts a fresh sweep.
    pub fn take_results(&mut self) -> ResultStore {
        self.latest.clear();
        self.overlay.clear();
        std::mem::take(&mut self.store)
    }

    pub fn reset(&mut self) {
        self.take_results();
    }
}

pub(crate) fn charge_series_of(store: &ResultStore, electrode: Electrode) -> Vec<ChargePoint> {
    store
        .results_for(electrode)
        .map(|result| ChargePoint {
            frequency: result.frequency(),
            charge: result.usable_charge(),
        })
        .collect()
}

pub(crate) fn charge_map_of(store: &ResultStore) -> ChargeMap {
    store
        .electrodes()
        .into_iter()
        .map(|electrode| {
            let charges = charge_series_of(store, electrode)
                .into_iter()
                .map(|point| (point.frequency, point.charge))
                .collect();
            (electrode, charges)
        })
        .collect()
}
