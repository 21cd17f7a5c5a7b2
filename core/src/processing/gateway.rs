use crate::interface::{FileEvent, SweepEvent};
use crate::prelude::{AnalysisScopeParams, Electrode, RenderSink, RenderTarget, TrendError, TrendResult, XAxisMode};
use crate::processing::export::Exporter;
use crate::processing::hold::SessionSnapshot;
use crate::processing::session::{Effect, Session, SessionEvent};
use crate::telemetry::{LogManager, Metrics, MetricsRecorder};
use std::io::Write;

/// Entry point from the transport layer. Every call runs to completion:
/// reduce the event into the session, then render whatever it affected.
pub struct IngestionGateway<S: RenderSink> {
    session: Session,
    sink: S,
    target: RenderTarget,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl<S: RenderSink> IngestionGateway<S> {
    pub fn new(sink: S, target: RenderTarget) -> Self {
        Self {
            session: Session::new(),
            sink,
            target,
            logger: LogManager::new("gateway"),
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> TrendResult<Effect> {
        let kind = event.kind();
        match self.session.reduce(event) {
            Ok(effect) => {
                self.metrics.record_accepted();
                log::debug!("{} event accepted, effect {:?}", kind, effect);
                self.render(effect);
                Ok(effect)
            }
            Err(error) => {
                if matches!(error, TrendError::MalformedEventKey(_)) {
                    self.metrics.record_malformed();
                } else {
                    self.metrics.record_rejected();
                }
                self.logger.diagnostic(&error);
                Err(error)
            }
        }
    }

    pub fn start(&mut self, params: AnalysisScopeParams) -> TrendResult<Effect> {
        self.logger.clear();
        self.handle(SessionEvent::Start { params })
    }

    pub fn stop(&mut self) -> TrendResult<Effect> {
        self.handle(SessionEvent::Stop)
    }

    pub fn reset(&mut self) -> TrendResult<Effect> {
        self.logger.clear();
        self.handle(SessionEvent::Reset)
    }

    pub fn ingest_file(&mut self, event: FileEvent) -> TrendResult<Effect> {
        self.handle(SessionEvent::File(event))
    }

    pub fn ingest_sweep(&mut self, event: SweepEvent) -> TrendResult<Effect> {
        self.handle(SessionEvent::Sweep(event))
    }

    pub fn set_normalization_index(&mut self, index: usize) -> TrendResult<Effect> {
        self.handle(SessionEvent::SetNormalizationIndex { index })
    }

    pub fn set_injection_index(&mut self, index: Option<usize>) -> TrendResult<Effect> {
        self.handle(SessionEvent::SetInjectionIndex { index })
    }

    pub fn set_x_axis_mode(&mut self, mode: XAxisMode) -> TrendResult<Effect> {
        self.handle(SessionEvent::SetXAxisMode { mode })
    }

    pub fn select_electrode(&mut self, electrode: Electrode) -> TrendResult<Effect> {
        self.handle(SessionEvent::SelectElectrode { electrode })
    }

    pub fn hold(&mut self, held_label: &str, current_label: &str) -> TrendResult<&SessionSnapshot> {
        self.handle(SessionEvent::Hold {
            held_label: held_label.to_string(),
            current_label: current_label.to_string(),
        })?;
        self.session.snapshot().ok_or(TrendError::NothingToHold)
    }

    pub fn export_csv<W: Write>(&self, out: W) -> TrendResult<()> {
        Exporter::write_csv(&Exporter::session_tables(&self.session), out)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.logger.recent()
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    fn render(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::RenderTrends => {
                if let Some(view) = self.session.derive_view() {
                    self.sink.render_trends(&self.target, &view);
                    self.metrics.record_render();
                }
            }
            Effect::RenderSweep => {
                if let Some(view) = self.session.sweep_view() {
                    self.sink.render_sweep(&self.target, &view);
                    self.metrics.record_render();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::AnalysisPayload;
    use crate::prelude::AcquisitionMode;
    use crate::processing::hold::DisplayRole;
    use crate::processing::session::{SweepView, TrendView};

    #[derive(Default)]
    struct RecordingSink {
        trends: Vec<TrendView>,
        sweeps: Vec<SweepView>,
    }

    impl RenderSink for RecordingSink {
        fn render_trends(&mut self, _target: &RenderTarget, view: &TrendView) {
            self.trends.push(view.clone());
        }

        fn render_sweep(&mut self, _target: &RenderTarget, view: &SweepView) {
            self.sweeps.push(view.clone());
        }
    }

    fn gateway() -> IngestionGateway<RecordingSink> {
        IngestionGateway::new(RecordingSink::default(), RenderTarget::default())
    }

    #[test]
    fn parameter_change_triggers_render() {
        let mut gateway = gateway();
        gateway.start(AnalysisScopeParams::new(3, [10, 100])).unwrap();
        gateway
            .ingest_file(FileEvent::new("x_10Hz_2.txt", Electrode::Averaged, AnalysisPayload::with_peak(4.0)))
            .unwrap();
        gateway.set_normalization_index(2).unwrap();

        let latest = gateway.sink().trends.last().unwrap();
        assert_eq!(latest.bundle.normalized_series[&10][1], Some(1.0));
        assert_eq!(gateway.sink().trends.len(), 2);
    }

    #[test]
    fn rejected_events_become_diagnostics() {
        let mut gateway = gateway();
        let mut params = AnalysisScopeParams::new(1, [10, 100]);
        params.mode = AcquisitionMode::Sweep;
        gateway.start(params).unwrap();

        let event = SweepEvent::new(10, Electrode::Averaged, AnalysisPayload::with_charge(1.0));
        gateway.ingest_sweep(event.clone()).unwrap();
        assert!(gateway.ingest_sweep(event).is_err());
        gateway
            .ingest_file(FileEvent::new("bad.txt", Electrode::Averaged, AnalysisPayload::default()))
            .unwrap_err();

        let metrics = gateway.metrics();
        assert_eq!(metrics.accepted, 2);
        assert_eq!(metrics.rejected, 2);
        assert_eq!(gateway.diagnostics().len(), 2);
    }

    #[test]
    fn display_controls_rerender_the_active_view() {
        let mut gateway = gateway();
        let mut params = AnalysisScopeParams::new(4, [10, 100]);
        params.selected_electrodes.extend([0, 1]);
        gateway.start(params).unwrap();
        for sequence in 1..=4 {
            let name = format!("x_10Hz_{sequence}.txt");
            gateway
                .ingest_file(FileEvent::new(name.clone(), Electrode::Channel(0), AnalysisPayload::with_peak(1.0)))
                .unwrap();
            gateway
                .ingest_file(FileEvent::new(name, Electrode::Channel(1), AnalysisPayload::with_peak(2.0)))
                .unwrap();
        }
        let renders = gateway.sink().trends.len();

        gateway.set_injection_index(Some(2)).unwrap();
        let view = gateway.sink().trends.last().unwrap();
        assert_eq!(view.segments.pivot, Some(2.0));

        gateway.set_x_axis_mode(XAxisMode::ElapsedTime).unwrap();
        let view = gateway.sink().trends.last().unwrap();
        assert_eq!(view.x_axis_mode, XAxisMode::ElapsedTime);
        assert_eq!(view.bundle.x_axis_values[1], 20.0 / 60.0);

        gateway.select_electrode(Electrode::Channel(1)).unwrap();
        let view = gateway.sink().trends.last().unwrap();
        assert_eq!(view.electrode, Electrode::Channel(1));
        assert_eq!(view.bundle.raw_peak_series[&10][0], Some(2.0));
        assert_eq!(gateway.sink().trends.len(), renders + 3);
    }

    #[test]
    fn stop_and_reset_end_the_session() {
        let mut gateway = gateway();
        gateway.start(AnalysisScopeParams::new(2, [10, 100])).unwrap();
        gateway.stop().unwrap();
        assert!(!gateway.session().is_running());
        assert_eq!(
            gateway.set_normalization_index(1).unwrap_err(),
            TrendError::NoActiveSession
        );
        assert_eq!(gateway.diagnostics().len(), 1);

        gateway.reset().unwrap();
        assert!(gateway.diagnostics().is_empty());
        assert_eq!(gateway.metrics().rejected, 1);
    }

    #[test]
    fn hold_returns_the_frozen_snapshot() {
        let mut gateway = gateway();
        let mut params = AnalysisScopeParams::new(1, [10, 100]);
        params.mode = AcquisitionMode::Sweep;
        gateway.start(params).unwrap();
        assert_eq!(gateway.hold("Baseline", "Treated").unwrap_err(), TrendError::NothingToHold);

        gateway
            .ingest_sweep(SweepEvent::new(10, Electrode::Averaged, AnalysisPayload::with_charge(1.5)))
            .unwrap();
        let snapshot = gateway.hold("Baseline", "Treated").unwrap();
        assert_eq!(snapshot.label(DisplayRole::Held), "Baseline");
        assert_eq!(snapshot.len(), 1);

        let held = gateway.sink().sweeps.last().unwrap().held.clone().unwrap();
        assert_eq!(held.charge_series[0].charge, Some(1.5));
        assert_eq!(gateway.hold("Again", "Later").unwrap_err(), TrendError::AlreadyHolding);
    }

    #[test]
    fn export_writes_current_block() {
        let mut gateway = gateway();
        gateway.start(AnalysisScopeParams::new(2, [10, 100])).unwrap();
        gateway
            .ingest_file(FileEvent::new("x_10Hz_1.txt", Electrode::Averaged, AnalysisPayload::with_peak(2.0)))
            .unwrap();
        let mut buffer = Vec::new();
        gateway.export_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("Current\nfile_sequence,file_number,Averaged 10Hz peak"));
    }
}
