use crate::prelude::{Electrode, FileSequence, FrequencyHz};
use serde::{Deserialize, Serialize};

/// Outcome reported by the analysis pipeline for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Success,
    Warning,
    Error,
}

impl AnalysisStatus {
    /// Success and warning results both carry a usable peak.
    pub fn is_ok(&self) -> bool {
        !matches!(self, AnalysisStatus::Error)
    }
}

/// Per-file output of the external analysis pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub peak_value: Option<f64>,
    #[serde(default)]
    pub charge: Option<f64>,
    #[serde(default)]
    pub potentials: Vec<f64>,
    #[serde(default)]
    pub raw_currents: Vec<f64>,
    #[serde(default)]
    pub smoothed_currents: Vec<f64>,
    #[serde(default)]
    pub baseline: Vec<f64>,
    #[serde(default)]
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Electrode count the pipeline found in the source file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_electrodes: Option<u16>,
}

impl AnalysisPayload {
    pub fn with_peak(peak_value: f64) -> Self {
        Self {
            peak_value: Some(peak_value),
            ..Default::default()
        }
    }

    pub fn with_charge(charge: f64) -> Self {
        Self {
            charge: Some(charge),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>, detected_electrodes: Option<u16>) -> Self {
        Self {
            status: AnalysisStatus::Error,
            message: Some(message.into()),
            detected_electrodes,
            ..Default::default()
        }
    }
}

/// Absolute storage key of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    pub electrode: Electrode,
    pub frequency: FrequencyHz,
    pub file_sequence: FileSequence,
}

impl ResultKey {
    pub fn new(electrode: Electrode, frequency: FrequencyHz, file_sequence: FileSequence) -> Self {
        Self {
            electrode,
            frequency,
            file_sequence,
        }
    }
}

/// A keyed analysis result. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementResult {
    key: ResultKey,
    payload: AnalysisPayload,
}

impl MeasurementResult {
    pub fn new(key: ResultKey, payload: AnalysisPayload) -> Self {
        Self { key, payload }
    }

    pub fn key(&self) -> ResultKey {
        self.key
    }

    pub fn electrode(&self) -> Electrode {
        self.key.electrode
    }

    pub fn frequency(&self) -> FrequencyHz {
        self.key.frequency
    }

    pub fn file_sequence(&self) -> FileSequence {
        self.key.file_sequence
    }

    pub fn payload(&self) -> &AnalysisPayload {
        &self.payload
    }

    pub fn usable_peak(&self) -> Option<f64> {
        self.usable(self.payload.peak_value)
    }

    pub fn usable_charge(&self) -> Option<f64> {
        self.usable(self.payload.charge)
    }

    /// Detected electrode count when the pipeline could not find the
    /// requested channel in the file.
    pub fn coverage_shortfall(&self) -> Option<u16> {
        if self.payload.status.is_ok() {
            return None;
        }
        match (self.key.electrode, self.payload.detected_electrodes) {
            (Electrode::Channel(index), Some(detected)) if index >= detected => Some(detected),
            _ => None,
        }
    }

    fn usable(&self, value: Option<f64>) -> Option<f64> {
        if !self.payload.status.is_ok() {
            return None;
        }
        value.filter(|v| v.is_finite())
    }
}
