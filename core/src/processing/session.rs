use crate::interface::{FileEvent, MeasurementResult, SweepEvent};
use crate::prelude::{
    AcquisitionMode, AnalysisScopeParams, Electrode, TrendError, TrendResult, XAxisMode,
};
use crate::processing::derived::{DerivedMetricCalculator, DerivedTrendBundle};
use crate::processing::hold::{DisplayRole, HoldManager, SessionSnapshot};
use crate::processing::split::{InjectionSplitter, SegmentedBundle};
use crate::processing::store::{InsertOutcome, InsertPolicy, ResultStore};
use crate::processing::sweep::{ChargePoint, SweepAggregator, SweepDisplay};
use crate::processing::trend::TrendReconstructor;
use serde::{Deserialize, Serialize};

/// Everything that can change a session, from transport or user controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Start { params: AnalysisScopeParams },
    Stop,
    Reset,
    File(FileEvent),
    Sweep(SweepEvent),
    SetNormalizationIndex { index: usize },
    SetInjectionIndex { index: Option<usize> },
    SetXAxisMode { mode: XAxisMode },
    SelectElectrode { electrode: Electrode },
    SetTimeAxis { minutes: Vec<f64> },
    Hold { held_label: String, current_label: String },
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Start { .. } => "start",
            SessionEvent::Stop => "stop",
            SessionEvent::Reset => "reset",
            SessionEvent::File(_) => "file",
            SessionEvent::Sweep(_) => "sweep",
            SessionEvent::SetNormalizationIndex { .. } => "set_normalization_index",
            SessionEvent::SetInjectionIndex { .. } => "set_injection_index",
            SessionEvent::SetXAxisMode { .. } => "set_x_axis_mode",
            SessionEvent::SelectElectrode { .. } => "select_electrode",
            SessionEvent::SetTimeAxis { .. } => "set_time_axis",
            SessionEvent::Hold { .. } => "hold",
        }
    }
}

/// Which view, if any, must be re-rendered after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    RenderTrends,
    RenderSweep,
}

/// Continuous-mode view of the displayed electrode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendView {
    pub electrode: Electrode,
    pub x_axis_mode: XAxisMode,
    pub bundle: DerivedTrendBundle,
    pub segments: SegmentedBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeldSweep {
    pub label: String,
    pub charge_series: Vec<ChargePoint>,
    pub results: Vec<MeasurementResult>,
}

/// Sweep-mode view of the displayed electrode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepView {
    pub electrode: Electrode,
    pub display: SweepDisplay,
    pub current_label: Option<String>,
    /// Latest result, or every frequency when overlaid.
    pub curves: Vec<MeasurementResult>,
    pub charge_series: Vec<ChargePoint>,
    pub electrode_complete: bool,
    pub sweep_complete: bool,
    pub held: Option<HeldSweep>,
}

/// Explicit session context: scope, stored results, live sweep and held
/// snapshot. All mutation goes through [`Session::reduce`].
#[derive(Debug, Default)]
pub struct Session {
    scope: Option<AnalysisScopeParams>,
    store: ResultStore,
    sweep: SweepAggregator,
    hold: HoldManager,
    active: Option<Electrode>,
    time_axis: Option<Vec<f64>>,
    halted: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(&mut self, event: SessionEvent) -> TrendResult<Effect> {
        match event {
            SessionEvent::Start { params } => self.start(params),
            SessionEvent::Stop => {
                self.stop();
                Ok(self.held_effect())
            }
            SessionEvent::Reset => {
                self.stop();
                self.hold.reset();
                Ok(Effect::None)
            }
            SessionEvent::File(event) => self.ingest_file(event),
            SessionEvent::Sweep(event) => self.ingest_sweep(event),
            SessionEvent::SetNormalizationIndex { index } => {
                self.scope_mut()?.normalization_index = index;
                self.recompute_effect()
            }
            SessionEvent::SetInjectionIndex { index } => {
                self.scope_mut()?.injection_index = index;
                self.recompute_effect()
            }
            SessionEvent::SetXAxisMode { mode } => {
                self.scope_mut()?.x_axis_mode = mode;
                self.recompute_effect()
            }
            SessionEvent::SelectElectrode { electrode } => {
                self.scope()?;
                self.active = Some(electrode);
                self.view_effect()
            }
            SessionEvent::SetTimeAxis { minutes } => {
                self.scope()?;
                self.time_axis = Some(minutes);
                self.recompute_effect()
            }
            SessionEvent::Hold {
                held_label,
                current_label,
            } => {
                self.hold.hold(&mut self.sweep, held_label, current_label)?;
                Ok(Effect::RenderSweep)
            }
        }
    }

    /// Recomputed trend view for the displayed electrode; `None` means
    /// there is nothing to render yet.
    pub fn derive_view(&self) -> Option<TrendView> {
        let scope = self.scope.as_ref()?;
        let electrode = self.active_electrode()?;
        let bundle = self.derive_bundle(electrode)?;
        let segments = InjectionSplitter::segment_bundle(&bundle, scope);
        Some(TrendView {
            electrode,
            x_axis_mode: scope.x_axis_mode,
            bundle,
            segments,
        })
    }

    pub fn derive_bundle(&self, electrode: Electrode) -> Option<DerivedTrendBundle> {
        let scope = self.scope.as_ref()?;
        let raw = TrendReconstructor::reconstruct(&self.store, scope, electrode)?;
        Some(DerivedMetricCalculator::compute(
            &raw,
            scope,
            self.time_axis.as_deref(),
        ))
    }

    /// Between sessions only a held snapshot is left to show; it is shown
    /// for its first electrode.
    pub fn sweep_view(&self) -> Option<SweepView> {
        let electrode = self.active_electrode().or_else(|| {
            self.hold
                .snapshot()
                .and_then(|snapshot| snapshot.electrodes().first().copied())
        })?;
        let display = self.sweep.display(electrode);
        let curves = match display {
            SweepDisplay::Empty => Vec::new(),
            SweepDisplay::Latest(_) => self.sweep.latest_result(electrode).cloned().into_iter().collect(),
            SweepDisplay::Overlay => self.sweep.results_for(electrode),
        };
        let snapshot = self.hold.snapshot();
        let held = snapshot.map(|snapshot| HeldSweep {
            label: snapshot.label(DisplayRole::Held).to_string(),
            charge_series: snapshot.charge_series(electrode),
            results: snapshot.results_for(electrode),
        });
        if curves.is_empty() && held.is_none() {
            return None;
        }

        let (electrode_complete, sweep_complete) = self
            .scope
            .as_ref()
            .map(|scope| {
                (
                    self.sweep.is_electrode_complete(electrode, scope),
                    self.sweep.is_complete(scope),
                )
            })
            .unwrap_or_default();

        Some(SweepView {
            electrode,
            display,
            current_label: snapshot.map(|s| s.label(DisplayRole::Current).to_string()),
            curves,
            charge_series: self.sweep.charge_series(electrode),
            electrode_complete,
            sweep_complete,
            held,
        })
    }

    pub fn scope(&self) -> TrendResult<&AnalysisScopeParams> {
        self.scope.as_ref().ok_or(TrendError::NoActiveSession)
    }

    pub fn is_running(&self) -> bool {
        self.scope.is_some()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn sweep(&self) -> &SweepAggregator {
        &self.sweep
    }

    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        self.hold.snapshot()
    }

    pub fn halted(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    /// Displayed electrode, defaulting to the first electrode in scope.
    pub fn active_electrode(&self) -> Option<Electrode> {
        self.active
            .or_else(|| self.scope.as_ref().map(AnalysisScopeParams::default_electrode))
    }

    fn start(&mut self, params: AnalysisScopeParams) -> TrendResult<Effect> {
        params.validate()?;
        self.stop();
        self.active = Some(params.default_electrode());
        self.scope = Some(params);
        Ok(self.held_effect())
    }

    /// Discards results and parameters; a held snapshot survives.
    fn stop(&mut self) {
        self.scope = None;
        self.store.clear();
        self.sweep.reset();
        self.active = None;
        self.time_axis = None;
        self.halted = None;
    }

    fn ingest_file(&mut self, event: FileEvent) -> TrendResult<Effect> {
        self.ensure_mode(AcquisitionMode::Continuous)?;
        let result = event.into_result()?;
        self.check_coverage(&result)?;

        let electrode = result.electrode();
        let outcome = self.store.insert(result, InsertPolicy::Overwrite)?;
        if outcome == InsertOutcome::Unchanged || Some(electrode) != self.active_electrode() {
            return Ok(Effect::None);
        }
        Ok(Effect::RenderTrends)
    }

    fn ingest_sweep(&mut self, event: SweepEvent) -> TrendResult<Effect> {
        let scope = self.ensure_mode(AcquisitionMode::Sweep)?.clone();
        let result = event.into_result();
        self.check_coverage(&result)?;

        let progress = self.sweep.record(result, &scope)?;
        if Some(progress.electrode) == self.active_electrode() {
            Ok(Effect::RenderSweep)
        } else {
            Ok(Effect::None)
        }
    }

    fn ensure_mode(&self, expected: AcquisitionMode) -> TrendResult<&AnalysisScopeParams> {
        let scope = self.scope()?;
        if let Some(reason) = &self.halted {
            return Err(TrendError::SessionHalted(reason.clone()));
        }
        if scope.mode != expected {
            return Err(TrendError::WrongMode { expected });
        }
        Ok(scope)
    }

    /// A channel the pipeline could not find halts the whole session.
    fn check_coverage(&mut self, result: &MeasurementResult) -> TrendResult<()> {
        if let Some(detected) = result.coverage_shortfall() {
            let error = TrendError::IncompleteElectrodeCoverage {
                requested: result.electrode(),
                detected,
            };
            self.halted = Some(error.to_string());
            return Err(error);
        }
        Ok(())
    }

    fn scope_mut(&mut self) -> TrendResult<&mut AnalysisScopeParams> {
        self.scope.as_mut().ok_or(TrendError::NoActiveSession)
    }

    fn recompute_effect(&self) -> TrendResult<Effect> {
        match self.scope()?.mode {
            AcquisitionMode::Continuous => Ok(Effect::RenderTrends),
            AcquisitionMode::Sweep => Ok(Effect::None),
        }
    }

    fn held_effect(&self) -> Effect {
        if self.hold.is_holding() {
            Effect::RenderSweep
        } else {
            Effect::None
        }
    }

    fn view_effect(&self) -> TrendResult<Effect> {
        match self.scope()?.mode {
            AcquisitionMode::Continuous => Ok(Effect::RenderTrends),
            AcquisitionMode::Sweep => Ok(Effect::RenderSweep),
        }
    }
}
