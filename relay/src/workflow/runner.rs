use crate::workflow::config::SessionConfig;
use anyhow::Context;
use sacmescore::prelude::{AcquisitionMode, RenderSink};
use sacmescore::processing::{IngestionGateway, SessionEvent};

/// Summary of one replayed event stream.
#[derive(Debug, Default)]
pub struct WorkflowResult {
    pub accepted: usize,
    pub rejected: usize,
    pub renders: usize,
    pub diagnostics: Vec<String>,
    /// Last non-empty KDM value of the active electrode (continuous mode).
    pub latest_kdm: Option<f64>,
    pub sweep_complete: bool,
    pub holding: bool,
}

#[derive(Clone)]
pub struct Runner {
    config: SessionConfig,
}

impl Runner {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Builds a gateway around `sink` with a session already started.
    pub fn build_gateway<S: RenderSink>(&self, sink: S) -> anyhow::Result<IngestionGateway<S>> {
        let mut gateway = IngestionGateway::new(sink, self.config.targets.clone());
        gateway
            .start(self.config.scope.clone())
            .context("starting analysis session")?;
        Ok(gateway)
    }

    pub fn execute<S: RenderSink>(
        &self,
        gateway: &mut IngestionGateway<S>,
        events: Vec<SessionEvent>,
    ) -> WorkflowResult {
        let mut result = WorkflowResult::default();
        for event in events {
            let kind = event.kind();
            match gateway.handle(event) {
                Ok(_) => result.accepted += 1,
                Err(err) => {
                    log::warn!("{} event rejected: {}", kind, err);
                    result.rejected += 1;
                }
            }
        }

        let session = gateway.session();
        result.renders = gateway.metrics().renders;
        result.diagnostics = gateway.diagnostics();
        result.holding = session.snapshot().is_some();
        if let Ok(scope) = session.scope() {
            match scope.mode {
                AcquisitionMode::Continuous => {
                    result.latest_kdm = session.derive_view().and_then(|view| {
                        view.bundle
                            .differential_metric_series
                            .iter()
                            .rev()
                            .find_map(|value| *value)
                    });
                }
                AcquisitionMode::Sweep => result.sweep_complete = session.sweep().is_complete(scope),
            }
        }
        result
    }
}
