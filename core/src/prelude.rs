use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Excitation frequency in Hz (continuous mode) or sweep group id.
pub type FrequencyHz = u32;

/// 1-based ordinal of a measurement file within a bounded run.
pub type FileSequence = u32;

/// One nullable peak value per file index, always `num_files` long.
pub type TrendSeries = Vec<Option<f64>>;

/// Logical measurement channel.
///
/// `Averaged` is the pseudo-channel used when no specific electrode was
/// selected; channels are 0-based indices into the instrument's columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Electrode {
    Averaged,
    Channel(u16),
}

impl Electrode {
    pub fn channel(&self) -> Option<u16> {
        match self {
            Electrode::Averaged => None,
            Electrode::Channel(index) => Some(*index),
        }
    }
}

impl From<Option<u16>> for Electrode {
    fn from(value: Option<u16>) -> Self {
        value.map(Electrode::Channel).unwrap_or(Electrode::Averaged)
    }
}

impl fmt::Display for Electrode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Electrode::Averaged => write!(f, "Averaged"),
            Electrode::Channel(index) => write!(f, "Electrode {}", index + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAxisMode {
    #[default]
    FileNumber,
    ElapsedTime,
}

/// How incoming events are interpreted for the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Each event is one file of a multi-file time series.
    #[default]
    Continuous,
    /// Each event is one fully analyzed frequency of a sweep.
    Sweep,
}

/// Formula used for the kinetic differential metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdmFormula {
    /// `((highNorm - lowNorm) + 1) * 100` over the normalized series.
    #[default]
    NormalizedDifference,
    /// `lowPeak / highPeak` over the raw series.
    RawRatio,
}

fn default_normalization_index() -> usize {
    1
}

fn default_sample_rate_seconds() -> f64 {
    20.0
}

/// Parameters fixed at session start. Only `normalization_index`,
/// `injection_index` and `x_axis_mode` change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisScopeParams {
    pub num_files: usize,
    pub frequencies: BTreeSet<FrequencyHz>,
    #[serde(default)]
    pub selected_electrodes: BTreeSet<u16>,
    #[serde(default = "default_normalization_index")]
    pub normalization_index: usize,
    #[serde(default)]
    pub injection_index: Option<usize>,
    #[serde(default)]
    pub x_axis_mode: XAxisMode,
    #[serde(default = "default_sample_rate_seconds")]
    pub sample_rate_seconds: f64,
    #[serde(default)]
    pub mode: AcquisitionMode,
    #[serde(default)]
    pub kdm_formula: KdmFormula,
}

impl AnalysisScopeParams {
    pub fn new(num_files: usize, frequencies: impl IntoIterator<Item = FrequencyHz>) -> Self {
        Self {
            num_files,
            frequencies: frequencies.into_iter().collect(),
            selected_electrodes: BTreeSet::new(),
            normalization_index: default_normalization_index(),
            injection_index: None,
            x_axis_mode: XAxisMode::default(),
            sample_rate_seconds: default_sample_rate_seconds(),
            mode: AcquisitionMode::default(),
            kdm_formula: KdmFormula::default(),
        }
    }

    pub fn validate(&self) -> TrendResult<()> {
        if self.num_files == 0 {
            return Err(TrendError::InvalidParams("num_files must be at least 1".into()));
        }
        if self.frequencies.len() < 2 {
            return Err(TrendError::InvalidParams(format!(
                "at least two frequencies are required, got {}",
                self.frequencies.len()
            )));
        }
        if !(self.sample_rate_seconds.is_finite() && self.sample_rate_seconds > 0.0) {
            return Err(TrendError::InvalidParams(format!(
                "sample rate must be positive, got {}",
                self.sample_rate_seconds
            )));
        }
        Ok(())
    }

    pub fn low_frequency(&self) -> Option<FrequencyHz> {
        self.frequencies.first().copied()
    }

    pub fn high_frequency(&self) -> Option<FrequencyHz> {
        self.frequencies.last().copied()
    }

    /// Electrodes a session must cover: the selected channels, or the
    /// averaged pseudo-channel when none were selected.
    pub fn target_electrodes(&self) -> Vec<Electrode> {
        if self.selected_electrodes.is_empty() {
            vec![Electrode::Averaged]
        } else {
            self.selected_electrodes
                .iter()
                .map(|&index| Electrode::Channel(index))
                .collect()
        }
    }

    /// Electrode displayed first after session start.
    pub fn default_electrode(&self) -> Electrode {
        self.target_electrodes()
            .first()
            .copied()
            .unwrap_or(Electrode::Averaged)
    }
}

/// Common error type for ingestion, recomputation and hold handling.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrendError {
    #[error("malformed event key: {0}")]
    MalformedEventKey(String),
    #[error("frequency {frequency} Hz already recorded for {electrode} in the current sweep")]
    DuplicateSweepFrequency {
        electrode: Electrode,
        frequency: FrequencyHz,
    },
    #[error("file contains {detected} electrodes, but {requested} was requested")]
    IncompleteElectrodeCoverage { requested: Electrode, detected: u16 },
    #[error("a data set is already held; reset before holding again")]
    AlreadyHolding,
    #[error("no sweep results recorded yet; nothing to hold")]
    NothingToHold,
    #[error("no analysis session is running")]
    NoActiveSession,
    #[error("session halted: {0}")]
    SessionHalted(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("event requires {expected:?} mode")]
    WrongMode { expected: AcquisitionMode },
    #[error("frequency {0} Hz is not part of this session")]
    FrequencyOutOfScope(FrequencyHz),
    #[error("export failed: {0}")]
    Export(String),
}

impl TrendError {
    /// Errors that leave state untouched because the request conflicts with
    /// what is already recorded, as opposed to unreadable input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            TrendError::DuplicateSweepFrequency { .. }
                | TrendError::AlreadyHolding
                | TrendError::NothingToHold
                | TrendError::NoActiveSession
                | TrendError::SessionHalted(_)
                | TrendError::WrongMode { .. }
        )
    }
}

impl From<csv::Error> for TrendError {
    fn from(value: csv::Error) -> Self {
        TrendError::Export(value.to_string())
    }
}

impl From<std::io::Error> for TrendError {
    fn from(value: std::io::Error) -> Self {
        TrendError::Export(value.to_string())
    }
}

pub type TrendResult<T> = Result<T, TrendError>;

/// Opaque identifiers handed through to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTarget {
    pub trend_plot: String,
    pub sweep_plot: String,
}

/// Outbound render seam. Implementations must not call back into the session.
pub trait RenderSink {
    fn render_trends(&mut self, target: &RenderTarget, view: &crate::processing::TrendView);
    fn render_sweep(&mut self, target: &RenderTarget, view: &crate::processing::SweepView);
}
