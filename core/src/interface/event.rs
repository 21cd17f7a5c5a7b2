use crate::interface::measurement::{AnalysisPayload, MeasurementResult, ResultKey};
use crate::prelude::{Electrode, FileSequence, FrequencyHz, TrendError, TrendResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Instrument filename contract, e.g. `run_60Hz_12.txt` or `run_60Hz__12.DTA`.
static FILE_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)_(\d+)Hz_?_?(\d+)\.").expect("file key pattern is a valid regex")
});

/// Frequency and file sequence encoded in an instrument filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileKey {
    pub frequency: FrequencyHz,
    pub file_sequence: FileSequence,
}

impl FileKey {
    pub fn parse(filename: &str) -> TrendResult<Self> {
        let malformed = || TrendError::MalformedEventKey(filename.to_string());
        let captures = FILE_KEY_PATTERN.captures(filename).ok_or_else(malformed)?;
        let frequency = captures[1].parse::<FrequencyHz>().map_err(|_| malformed())?;
        let file_sequence = captures[2]
            .parse::<FileSequence>()
            .map_err(|_| malformed())?;
        if file_sequence == 0 {
            return Err(malformed());
        }
        Ok(Self {
            frequency,
            file_sequence,
        })
    }
}

/// Continuous-mode delivery: one analyzed file of a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    pub filename: String,
    /// `None` addresses the averaged pseudo-electrode.
    #[serde(default)]
    pub electrode: Option<u16>,
    pub data: AnalysisPayload,
}

impl FileEvent {
    pub fn new(filename: impl Into<String>, electrode: Electrode, data: AnalysisPayload) -> Self {
        Self {
            filename: filename.into(),
            electrode: electrode.channel(),
            data,
        }
    }

    pub fn into_result(self) -> TrendResult<MeasurementResult> {
        let key = FileKey::parse(&self.filename)?;
        Ok(MeasurementResult::new(
            ResultKey::new(self.electrode.into(), key.frequency, key.file_sequence),
            self.data,
        ))
    }
}

/// Sweep-mode delivery: one fully analyzed frequency for an electrode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    pub frequency: FrequencyHz,
    #[serde(default)]
    pub electrode: Option<u16>,
    pub data: AnalysisPayload,
}

impl SweepEvent {
    /// Sweep results occupy a single slot per frequency.
    pub const FILE_SEQUENCE: FileSequence = 1;

    pub fn new(frequency: FrequencyHz, electrode: Electrode, data: AnalysisPayload) -> Self {
        Self {
            frequency,
            electrode: electrode.channel(),
            data,
        }
    }

    pub fn into_result(self) -> MeasurementResult {
        MeasurementResult::new(
            ResultKey::new(self.electrode.into(), self.frequency, Self::FILE_SEQUENCE),
            self.data,
        )
    }
}
