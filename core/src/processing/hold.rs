use crate::interface::MeasurementResult;
use crate::prelude::{Electrode, TrendError, TrendResult};
use crate::processing::store::ResultStore;
use crate::processing::sweep::{charge_map_of, charge_series_of, ChargeMap, ChargePoint, SweepAggregator};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};

/// Which of the two side-by-side datasets a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayRole {
    Held,
    Current,
}

/// Frozen copy of a completed sweep. Nothing mutates it after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    held_label: String,
    current_label: String,
    results: ResultStore,
}

impl SessionSnapshot {
    pub fn label(&self, role: DisplayRole) -> &str {
        match role {
            DisplayRole::Held => &self.held_label,
            DisplayRole::Current => &self.current_label,
        }
    }

    pub fn electrodes(&self) -> Vec<Electrode> {
        self.results.electrodes().into_iter().collect()
    }

    pub fn charge_series(&self, electrode: Electrode) -> Vec<ChargePoint> {
        charge_series_of(&self.results, electrode)
    }

    pub fn charge_map(&self) -> ChargeMap {
        charge_map_of(&self.results)
    }

    pub fn results_for(&self, electrode: Electrode) -> Vec<MeasurementResult> {
        self.results.results_for(electrode).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Owns at most one held snapshot; survives session stop/restart.
#[derive(Debug)]
pub struct HoldManager {
    snapshot: Option<SessionSnapshot>,
    logger: LogManager,
}

impl HoldManager {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            logger: LogManager::new("hold"),
        }
    }

    /// Freezes the live sweep under `held_label` and empties it so the next
    /// sweep can populate as `current_label`.
    pub fn hold(
        &mut self,
        aggregator: &mut SweepAggregator,
        held_label: impl Into<String>,
        current_label: impl Into<String>,
    ) -> TrendResult<&SessionSnapshot> {
        if self.snapshot.is_some() {
            return Err(TrendError::AlreadyHolding);
        }
        if aggregator.is_empty() {
            return Err(TrendError::NothingToHold);
        }

        let snapshot = SessionSnapshot {
            held_label: held_label.into(),
            current_label: current_label.into(),
            results: aggregator.take_results(),
        };
        self.logger.record(&format!(
            "holding {} sweep results as '{}'",
            snapshot.len(),
            snapshot.held_label
        ));
        Ok(self.snapshot.insert(snapshot))
    }

    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_holding(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn reset(&mut self) {
        if self.snapshot.take().is_some() {
            self.logger.record("held snapshot released");
        }
    }
}

impl Default for HoldManager {
    fn default() -> Self {
        Self::new()
    }
}
