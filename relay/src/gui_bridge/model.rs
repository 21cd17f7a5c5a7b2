use sacmescore::prelude::{RenderSink, RenderTarget};
use sacmescore::processing::{SweepView, TrendView};
use sacmescore::telemetry::Metrics;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

/// Render model served to the external plotting front end.
#[derive(Debug, Clone, Serialize, Default)]
pub struct VisualizationModel {
    /// Bumped on every render so pollers can skip unchanged payloads.
    pub revision: u64,
    pub target: Option<String>,
    pub trends: Option<TrendView>,
    pub sweep: Option<SweepView>,
    pub diagnostics: Vec<String>,
    pub halted: Option<String>,
    pub metrics: Metrics,
}

/// Sink that writes rendered views into the shared model.
#[derive(Clone, Default)]
pub struct ModelSink {
    state: Arc<RwLock<VisualizationModel>>,
}

impl ModelSink {
    pub fn new(state: Arc<RwLock<VisualizationModel>>) -> Self {
        Self { state }
    }

    fn update(&self, apply: impl FnOnce(&mut VisualizationModel)) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard);
        guard.revision += 1;
    }
}

impl RenderSink for ModelSink {
    fn render_trends(&mut self, target: &RenderTarget, view: &TrendView) {
        self.update(|model| {
            model.target = Some(target.trend_plot.clone());
            model.trends = Some(view.clone());
        });
    }

    fn render_sweep(&mut self, target: &RenderTarget, view: &SweepView) {
        self.update(|model| {
            model.target = Some(target.sweep_plot.clone());
            model.sweep = Some(view.clone());
        });
    }
}
