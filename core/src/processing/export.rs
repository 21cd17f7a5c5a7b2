use crate::prelude::{AcquisitionMode, AnalysisScopeParams, Electrode, TrendResult, XAxisMode};
use crate::processing::derived::DerivedTrendBundle;
use crate::processing::hold::DisplayRole;
use crate::processing::session::Session;
use crate::processing::sweep::ChargeMap;
use std::collections::BTreeSet;
use std::io::Write;

/// Flat tabular dataset with a title row used to label held/current blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct Exporter;

impl Exporter {
    /// One row per file sequence; raw, normalized and KDM columns per electrode.
    pub fn trend_table(
        title: impl Into<String>,
        scope: &AnalysisScopeParams,
        bundles: &[(Electrode, DerivedTrendBundle)],
    ) -> ExportTable {
        let x_header = match scope.x_axis_mode {
            XAxisMode::FileNumber => "file_number",
            XAxisMode::ElapsedTime => "elapsed_minutes",
        };
        let mut headers = vec!["file_sequence".to_string(), x_header.to_string()];
        for (electrode, bundle) in bundles {
            for frequency in bundle.raw_peak_series.keys() {
                headers.push(format!("{electrode} {frequency}Hz peak"));
            }
            for frequency in bundle.normalized_series.keys() {
                headers.push(format!("{electrode} {frequency}Hz normalized"));
            }
            headers.push(format!("{electrode} KDM"));
        }

        let x_axis = bundles
            .first()
            .map(|(_, bundle)| bundle.x_axis_values.clone())
            .unwrap_or_default();
        let rows = (0..scope.num_files)
            .map(|i| {
                let mut row = vec![(i + 1).to_string(), Self::cell(x_axis.get(i).copied())];
                for (_, bundle) in bundles {
                    let series = bundle
                        .raw_peak_series
                        .values()
                        .chain(bundle.normalized_series.values())
                        .chain(std::iter::once(&bundle.differential_metric_series));
                    row.extend(series.map(|values| Self::cell(values.get(i).copied().flatten())));
                }
                row
            })
            .collect();

        ExportTable {
            title: title.into(),
            headers,
            rows,
        }
    }

    /// One row per frequency; one charge column per electrode.
    pub fn sweep_table(title: impl Into<String>, charges: &ChargeMap) -> ExportTable {
        let mut headers = vec!["frequency_hz".to_string()];
        headers.extend(charges.keys().map(|electrode| format!("{electrode} charge")));

        let frequencies: BTreeSet<_> = charges.values().flat_map(|by_frequency| by_frequency.keys().copied()).collect();
        let rows = frequencies
            .into_iter()
            .map(|frequency| {
                let mut row = vec![frequency.to_string()];
                row.extend(
                    charges
                        .values()
                        .map(|by_frequency| Self::cell(by_frequency.get(&frequency).copied().flatten())),
                );
                row
            })
            .collect();

        ExportTable {
            title: title.into(),
            headers,
            rows,
        }
    }

    /// Held dataset first (when present), then the live one.
    pub fn session_tables(session: &Session) -> Vec<ExportTable> {
        let mut tables = Vec::new();
        let snapshot = session.snapshot();
        if let Some(snapshot) = snapshot {
            tables.push(Self::sweep_table(
                format!("Held: {}", snapshot.label(DisplayRole::Held)),
                &snapshot.charge_map(),
            ));
        }

        let current_title = snapshot
            .map(|s| format!("Current: {}", s.label(DisplayRole::Current)))
            .unwrap_or_else(|| "Current".to_string());
        if let Ok(scope) = session.scope() {
            let table = match scope.mode {
                AcquisitionMode::Continuous => {
                    let bundles: Vec<_> = session
                        .store()
                        .electrodes()
                        .into_iter()
                        .filter_map(|electrode| session.derive_bundle(electrode).map(|b| (electrode, b)))
                        .collect();
                    Self::trend_table(current_title, scope, &bundles)
                }
                AcquisitionMode::Sweep => {
                    Self::sweep_table(current_title, &session.sweep().charge_map())
                }
            };
            tables.push(table);
        }
        tables
    }

    /// Writes each table as a CSV block: title row, header row, data rows,
    /// blank line between blocks.
    pub fn write_csv<W: Write>(tables: &[ExportTable], mut out: W) -> TrendResult<()> {
        for (index, table) in tables.iter().enumerate() {
            if index > 0 {
                out.write_all(b"\n")?;
            }
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(&mut out);
            writer.write_record([table.title.as_str()])?;
            writer.write_record(&table.headers)?;
            for row in &table.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        Ok(())
    }

    fn cell(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }
}
