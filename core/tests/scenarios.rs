use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sacmescore::interface::{AnalysisPayload, FileEvent, SweepEvent};
use sacmescore::prelude::{AcquisitionMode, AnalysisScopeParams, Electrode, XAxisMode};
use sacmescore::processing::{
    DerivedMetricCalculator, DisplayRole, Effect, InjectionSplitter, SegmentedSeries, Session,
    SessionEvent, SweepDisplay, TrendReconstructor,
};
use std::collections::BTreeMap;

fn start(session: &mut Session, params: AnalysisScopeParams) {
    session.reduce(SessionEvent::Start { params }).unwrap();
}

fn file(frequency: u32, sequence: u32, peak: f64) -> SessionEvent {
    SessionEvent::File(FileEvent::new(
        format!("run_{frequency}Hz_{sequence}.txt"),
        Electrode::Averaged,
        AnalysisPayload::with_peak(peak),
    ))
}

fn sweep(frequency: u32, electrode: Electrode, charge: f64) -> SessionEvent {
    SessionEvent::Sweep(SweepEvent::new(
        frequency,
        electrode,
        AnalysisPayload::with_charge(charge),
    ))
}

fn peak_for(frequency: u32, sequence: u32) -> f64 {
    frequency as f64 * 0.01 + sequence as f64
}

#[test]
fn out_of_order_sparse_delivery_reconstructs_by_key() {
    let mut session = Session::new();
    start(&mut session, AnalysisScopeParams::new(5, [10, 100]));
    for sequence in [1, 3, 2, 5] {
        session.reduce(file(10, sequence, peak_for(10, sequence))).unwrap();
    }

    let scope = session.scope().unwrap();
    let trends = TrendReconstructor::reconstruct(session.store(), scope, Electrode::Averaged).unwrap();
    assert_eq!(
        trends[&10],
        vec![
            Some(peak_for(10, 1)),
            Some(peak_for(10, 2)),
            Some(peak_for(10, 3)),
            None,
            Some(peak_for(10, 5)),
        ]
    );
}

#[test]
fn reconstruction_length_is_independent_of_arrival() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let num_files = rng.gen_range(1..12usize);
        let mut session = Session::new();
        start(&mut session, AnalysisScopeParams::new(num_files, [10, 60, 240]));

        let mut events: Vec<(u32, u32)> = [10, 60, 240]
            .iter()
            .flat_map(|&f| (1..=num_files as u32 + 2).map(move |s| (f, s)))
            .filter(|_| rng.gen_bool(0.6))
            .collect();
        events.shuffle(&mut rng);
        for (frequency, sequence) in events {
            session.reduce(file(frequency, sequence, peak_for(frequency, sequence))).unwrap();
        }

        if let Some(view) = session.derive_view() {
            assert!(view.bundle.raw_peak_series.values().all(|s| s.len() == num_files));
            assert!(view.bundle.normalized_series.values().all(|s| s.len() == num_files));
            assert_eq!(view.bundle.differential_metric_series.len(), num_files);
            assert_eq!(view.bundle.x_axis_values.len(), num_files);
        }
    }
}

#[test]
fn duplicate_continuous_delivery_is_idempotent() {
    let mut once = Session::new();
    let mut twice = Session::new();
    for session in [&mut once, &mut twice] {
        start(session, AnalysisScopeParams::new(3, [10, 100]));
        session.reduce(file(10, 1, 2.0)).unwrap();
        session.reduce(file(100, 1, 3.0)).unwrap();
    }
    assert_eq!(twice.reduce(file(10, 1, 2.0)).unwrap(), Effect::None);
    assert_eq!(once.derive_view(), twice.derive_view());
}

#[test]
fn later_delivery_overwrites_in_continuous_mode() {
    let mut session = Session::new();
    start(&mut session, AnalysisScopeParams::new(2, [10, 100]));
    session.reduce(file(10, 1, 2.0)).unwrap();
    session.reduce(file(10, 1, 5.0)).unwrap();
    let view = session.derive_view().unwrap();
    assert_eq!(view.bundle.raw_peak_series[&10][0], Some(5.0));
}

#[test]
fn normalization_scales_against_first_file() {
    let scope = AnalysisScopeParams::new(3, [10, 100]);
    let raw = BTreeMap::from([(10, vec![Some(2.0), Some(4.0), Some(6.0)]), (100, vec![None; 3])]);
    let bundle = DerivedMetricCalculator::compute(&raw, &scope, None);
    assert_eq!(bundle.normalized_series[&10], vec![Some(1.0), Some(2.0), Some(3.0)]);
}

#[test]
fn normalization_point_is_unity_after_mutation() {
    let mut session = Session::new();
    start(&mut session, AnalysisScopeParams::new(4, [10, 100]));
    for sequence in 1..=4 {
        session.reduce(file(10, sequence, sequence as f64 * 1.7)).unwrap();
        session.reduce(file(100, sequence, sequence as f64 * 0.3)).unwrap();
    }
    for index in 1..=4 {
        session.reduce(SessionEvent::SetNormalizationIndex { index }).unwrap();
        let view = session.derive_view().unwrap();
        for series in view.bundle.normalized_series.values() {
            assert_eq!(series[index - 1], Some(1.0));
        }
    }
}

#[test]
fn differential_metric_contrasts_high_and_low() {
    let scope = AnalysisScopeParams::new(2, [10, 100]);
    let raw = BTreeMap::from([
        (10, vec![Some(1.0), Some(1.0)]),
        (100, vec![Some(1.0), Some(1.5)]),
    ]);
    let bundle = DerivedMetricCalculator::compute(&raw, &scope, None);
    assert_eq!(bundle.normalized_series[&100], vec![Some(1.0), Some(1.5)]);
    assert_eq!(bundle.differential_metric_series, vec![Some(100.0), Some(150.0)]);
}

#[test]
fn failed_sweep_frequency_accepts_a_corrected_resend() {
    let mut session = Session::new();
    let mut params = AnalysisScopeParams::new(1, [10, 100]);
    params.mode = AcquisitionMode::Sweep;
    start(&mut session, params);

    session
        .reduce(SessionEvent::Sweep(SweepEvent::new(
            10,
            Electrode::Averaged,
            AnalysisPayload::failed("no peak found", None),
        )))
        .unwrap();
    session.reduce(sweep(100, Electrode::Averaged, 3.0)).unwrap();
    let view = session.sweep_view().unwrap();
    assert!(!view.sweep_complete);
    assert_eq!(view.display, SweepDisplay::Latest(100));

    session.reduce(sweep(10, Electrode::Averaged, 1.0)).unwrap();
    let view = session.sweep_view().unwrap();
    assert!(view.sweep_complete);
    assert_eq!(view.display, SweepDisplay::Overlay);
    let charges: Vec<_> = view.charge_series.iter().map(|point| point.charge).collect();
    assert_eq!(charges, vec![Some(1.0), Some(3.0)]);
}

#[test]
fn injection_split_is_continuous_in_both_axis_modes() {
    let mut session = Session::new();
    start(&mut session, AnalysisScopeParams::new(6, [10, 100]));
    for sequence in 1..=6 {
        session.reduce(file(10, sequence, sequence as f64)).unwrap();
    }

    for mode in [XAxisMode::FileNumber, XAxisMode::ElapsedTime] {
        session.reduce(SessionEvent::SetXAxisMode { mode }).unwrap();
        for index in 1..=6 {
            session
                .reduce(SessionEvent::SetInjectionIndex { index: Some(index) })
                .unwrap();
            let view = session.derive_view().unwrap();
            let SegmentedSeries::Split(split) = &view.segments.raw_peak_series[&10] else {
                panic!("expected split at injection index {index}");
            };
            assert_eq!(split.before_y.last(), split.after_y.first());
            assert_eq!(split.before_y.len() + split.after_y.len(), 7);
        }
    }

    session
        .reduce(SessionEvent::SetInjectionIndex { index: Some(7) })
        .unwrap();
    let view = session.derive_view().unwrap();
    assert!(matches!(
        view.segments.differential_metric_series,
        SegmentedSeries::Unsplit { .. }
    ));
}

#[test]
fn elapsed_time_pivot_uses_supplied_timebase() {
    let mut params = AnalysisScopeParams::new(3, [10, 100]);
    params.x_axis_mode = XAxisMode::ElapsedTime;
    params.injection_index = Some(2);
    let mut session = Session::new();
    start(&mut session, params);
    session.reduce(file(10, 1, 1.0)).unwrap();
    session
        .reduce(SessionEvent::SetTimeAxis {
            minutes: vec![0.0, 4.5, 9.0],
        })
        .unwrap();

    let view = session.derive_view().unwrap();
    assert_eq!(view.bundle.x_axis_values, vec![0.0, 4.5, 9.0]);
    assert_eq!(view.segments.pivot, Some(4.5));
    assert_eq!(
        InjectionSplitter::resolve_pivot(&view.bundle.x_axis_values, Some(2), XAxisMode::ElapsedTime, 3),
        Some(4.5)
    );
}

fn sweep_session(electrodes: &[u16]) -> Session {
    let mut params = AnalysisScopeParams::new(1, [5, 25, 100, 400]);
    params.mode = AcquisitionMode::Sweep;
    params.selected_electrodes.extend(electrodes.iter().copied());
    let mut session = Session::new();
    start(&mut session, params);
    session
}

#[test]
fn hold_snapshot_is_unaffected_by_later_events() {
    let mut session = sweep_session(&[]);
    for (frequency, charge) in [(5, 1.0), (25, 2.0), (100, 3.0), (400, 4.0)] {
        session.reduce(sweep(frequency, Electrode::Averaged, charge)).unwrap();
    }
    let effect = session
        .reduce(SessionEvent::Hold {
            held_label: "Baseline".into(),
            current_label: "Treated".into(),
        })
        .unwrap();
    assert_eq!(effect, Effect::RenderSweep);
    let frozen = session.snapshot().unwrap().charge_map();

    for (frequency, charge) in [(400, 40.0), (5, 10.0), (25, 20.0)] {
        session.reduce(sweep(frequency, Electrode::Averaged, charge)).unwrap();
    }
    session.reduce(SessionEvent::SetNormalizationIndex { index: 3 }).unwrap();

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.charge_map(), frozen);
    assert_eq!(snapshot.label(DisplayRole::Held), "Baseline");
    assert_eq!(
        frozen[&Electrode::Averaged].values().copied().collect::<Vec<_>>(),
        vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]
    );
    assert_eq!(session.sweep().charge_series(Electrode::Averaged).len(), 3);
}

#[test]
fn snapshot_survives_stop_and_restart_until_reset() {
    let mut session = sweep_session(&[]);
    session.reduce(sweep(5, Electrode::Averaged, 1.0)).unwrap();
    session
        .reduce(SessionEvent::Hold {
            held_label: "A".into(),
            current_label: "B".into(),
        })
        .unwrap();

    session.reduce(SessionEvent::Stop).unwrap();
    assert!(session.snapshot().is_some());

    let mut params = AnalysisScopeParams::new(1, [5, 25]);
    params.mode = AcquisitionMode::Sweep;
    start(&mut session, params);
    assert!(session.snapshot().is_some());
    let err = session
        .reduce(SessionEvent::Hold {
            held_label: "C".into(),
            current_label: "D".into(),
        })
        .unwrap_err();
    assert_eq!(err, sacmescore::TrendError::AlreadyHolding);

    session.reduce(SessionEvent::Reset).unwrap();
    assert!(session.snapshot().is_none());
}

#[test]
fn overlay_tracks_completion_for_any_arrival_order() {
    let mut rng = StdRng::seed_from_u64(11);
    let electrodes = [Electrode::Channel(0), Electrode::Channel(1)];
    for _ in 0..10 {
        let mut session = sweep_session(&[0, 1]);
        let mut events: Vec<(u32, Electrode)> = [5, 25, 100, 400]
            .iter()
            .flat_map(|&f| electrodes.iter().map(move |&e| (f, e)))
            .collect();
        events.shuffle(&mut rng);

        for (frequency, electrode) in events {
            session.reduce(sweep(frequency, electrode, frequency as f64)).unwrap();
            let scope = session.scope().unwrap();
            for &watched in &electrodes {
                let complete = session.sweep().analyzed_frequencies(watched).len() == scope.frequencies.len();
                assert_eq!(session.sweep().display(watched) == SweepDisplay::Overlay, complete);
            }
        }
        let scope = session.scope().unwrap();
        assert!(session.sweep().is_complete(scope));
        let order: Vec<_> = session
            .sweep()
            .charge_series(Electrode::Channel(1))
            .iter()
            .map(|p| p.frequency)
            .collect();
        assert_eq!(order, vec![5, 25, 100, 400]);
    }
}

#[test]
fn export_includes_held_and_current_blocks() {
    let mut session = sweep_session(&[]);
    session.reduce(sweep(5, Electrode::Averaged, 1.0)).unwrap();
    session
        .reduce(SessionEvent::Hold {
            held_label: "Baseline".into(),
            current_label: "Treated".into(),
        })
        .unwrap();
    session.reduce(sweep(25, Electrode::Averaged, 2.5)).unwrap();

    let tables = sacmescore::processing::Exporter::session_tables(&session);
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].title, "Held: Baseline");
    assert_eq!(tables[1].title, "Current: Treated");
    assert_eq!(tables[1].rows, vec![vec!["25".to_string(), "2.5".to_string()]]);
}
