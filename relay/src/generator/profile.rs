use crate::generator::template::voltammogram;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sacmescore::interface::{AnalysisPayload, AnalysisStatus, FileEvent, SweepEvent};
use sacmescore::prelude::{AcquisitionMode, AnalysisScopeParams, FrequencyHz};
use sacmescore::processing::SessionEvent;
use serde::{Deserialize, Serialize};

const CURVE_POINTS: usize = 64;

/// Labels used when the generated run holds its first sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldLabels {
    pub held: String,
    pub current: String,
}

/// Configuration for generating synthetic analysis results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub handle: String,
    pub seed: u64,
    /// Relative jitter applied to every peak.
    pub noise: f64,
    /// Fraction of files that never arrive.
    pub drop_rate: f64,
    /// Fraction of files delivered twice.
    pub duplicate_rate: f64,
    /// Per-file signal loss at the highest frequency.
    pub decay: f64,
    pub shuffle: bool,
    pub hold: Option<HoldLabels>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            handle: "exp".into(),
            seed: 0,
            noise: 0.02,
            drop_rate: 0.1,
            duplicate_rate: 0.05,
            decay: 0.03,
            shuffle: true,
            hold: None,
        }
    }
}

fn payload(rng: &mut StdRng, peak: f64, noise: f64) -> AnalysisPayload {
    let jitter = if noise > 0.0 { rng.gen_range(-noise..noise) } else { 0.0 };
    let peak = peak * (1.0 + jitter);
    let curve = voltammogram(CURVE_POINTS, peak, -0.25, 0.04);
    AnalysisPayload {
        peak_value: Some(peak),
        charge: Some(peak * 0.6 / 8.0),
        potentials: curve.potentials,
        raw_currents: curve.currents.clone(),
        smoothed_currents: curve.currents,
        baseline: curve.baseline,
        status: AnalysisStatus::Success,
        ..Default::default()
    }
}

/// Signal-on response: the highest frequency decays with file index,
/// lower frequencies decay proportionally less.
fn peak_model(scope: &AnalysisScopeParams, frequency: FrequencyHz, file_index: usize, decay: f64) -> f64 {
    let high = scope.high_frequency().unwrap_or(frequency).max(1) as f64;
    let weight = frequency as f64 / high;
    let base = 1.0e-6 * (1.0 + frequency as f64).ln();
    base * (1.0 - decay * weight * file_index as f64).max(0.05)
}

pub fn build_file_events(scope: &AnalysisScopeParams, config: &GeneratorConfig) -> Vec<FileEvent> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut events = Vec::new();
    for electrode in scope.target_electrodes() {
        for file_index in 0..scope.num_files {
            for &frequency in &scope.frequencies {
                if rng.gen_bool(config.drop_rate.clamp(0.0, 1.0)) {
                    continue;
                }
                let peak = peak_model(scope, frequency, file_index, config.decay);
                let event = FileEvent::new(
                    format!("{}_{}Hz_{}.txt", config.handle, frequency, file_index + 1),
                    electrode,
                    payload(&mut rng, peak, config.noise),
                );
                if rng.gen_bool(config.duplicate_rate.clamp(0.0, 1.0)) {
                    events.push(event.clone());
                }
                events.push(event);
            }
        }
    }
    if config.shuffle {
        events.shuffle(&mut rng);
    }
    events
}

/// One full pass over every frequency for every electrode in scope.
pub fn build_sweep_events(scope: &AnalysisScopeParams, config: &GeneratorConfig, gain: f64) -> Vec<SweepEvent> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut events = Vec::new();
    for electrode in scope.target_electrodes() {
        for &frequency in &scope.frequencies {
            let peak = peak_model(scope, frequency, 0, config.decay) * gain;
            events.push(SweepEvent::new(frequency, electrode, payload(&mut rng, peak, config.noise)));
        }
    }
    if config.shuffle {
        events.shuffle(&mut rng);
    }
    events
}

/// Event stream for a whole offline run. In sweep mode with hold labels the
/// first sweep is held and a second, attenuated sweep follows.
pub fn build_session_events(scope: &AnalysisScopeParams, config: &GeneratorConfig) -> Vec<SessionEvent> {
    match scope.mode {
        AcquisitionMode::Continuous => build_file_events(scope, config)
            .into_iter()
            .map(SessionEvent::File)
            .collect(),
        AcquisitionMode::Sweep => {
            let mut events: Vec<SessionEvent> = build_sweep_events(scope, config, 1.0)
                .into_iter()
                .map(SessionEvent::Sweep)
                .collect();
            if let Some(labels) = &config.hold {
                events.push(SessionEvent::Hold {
                    held_label: labels.held.clone(),
                    current_label: labels.current.clone(),
                });
                let second = GeneratorConfig {
                    seed: config.seed.wrapping_add(1),
                    ..config.clone()
                };
                events.extend(
                    build_sweep_events(scope, &second, 0.7)
                        .into_iter()
                        .map(SessionEvent::Sweep),
                );
            }
            events
        }
    }
}
