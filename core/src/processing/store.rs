use crate::interface::{MeasurementResult, ResultKey};
use crate::prelude::{Electrode, FileSequence, FrequencyHz, TrendError, TrendResult};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// What to do when a result arrives for a key that is already occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPolicy {
    /// Last delivery wins (continuous mode).
    Overwrite,
    /// Keep the first usable delivery and reject the rest (sweep mode).
    /// A failed analysis stays replaceable.
    RejectDuplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Replaced,
    Unchanged,
}

/// Sparse keyed storage of measurement results; at most one per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    entries: BTreeMap<ResultKey, MeasurementResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        result: MeasurementResult,
        policy: InsertPolicy,
    ) -> TrendResult<InsertOutcome> {
        let key = result.key();
        let outcome = match self.entries.get(&key) {
            None => InsertOutcome::Inserted,
            Some(existing)
                if policy == InsertPolicy::RejectDuplicate && existing.payload().status.is_ok() =>
            {
                return Err(TrendError::DuplicateSweepFrequency {
                    electrode: key.electrode,
                    frequency: key.frequency,
                });
            }
            Some(existing) if *existing == result => return Ok(InsertOutcome::Unchanged),
            Some(_) => InsertOutcome::Replaced,
        };
        self.entries.insert(key, result);
        Ok(outcome)
    }

    pub fn get(&self, key: &ResultKey) -> Option<&MeasurementResult> {
        self.entries.get(key)
    }

    /// Usable peak at an absolute key, if any.
    pub fn peak(
        &self,
        electrode: Electrode,
        frequency: FrequencyHz,
        file_sequence: FileSequence,
    ) -> Option<f64> {
        self.get(&ResultKey::new(electrode, frequency, file_sequence))
            .and_then(MeasurementResult::usable_peak)
    }

    pub fn contains_electrode(&self, electrode: Electrode) -> bool {
        self.results_for(electrode).next().is_some()
    }

    pub fn results_for(&self, electrode: Electrode) -> impl Iterator<Item = &MeasurementResult> {
        self.entries
            .range(Self::electrode_range(electrode))
            .map(|(_, result)| result)
    }

    pub fn electrodes(&self) -> BTreeSet<Electrode> {
        self.entries.keys().map(|key| key.electrode).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn electrode_range(electrode: Electrode) -> RangeInclusive<ResultKey> {
        ResultKey::new(electrode, FrequencyHz::MIN, FileSequence::MIN)
            ..=ResultKey::new(electrode, FrequencyHz::MAX, FileSequence::MAX)
    }
}
