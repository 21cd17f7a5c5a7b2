use serde::Serialize;
use std::sync::Mutex;

/// Counters for ingestion outcomes and recomputations.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub accepted: usize,
    pub rejected: usize,
    pub malformed: usize,
    pub renders: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_accepted(&self) {
        self.update(|metrics| metrics.accepted += 1);
    }

    pub fn record_rejected(&self) {
        self.update(|metrics| metrics.rejected += 1);
    }

    pub fn record_malformed(&self) {
        self.update(|metrics| metrics.malformed += 1);
    }

    pub fn record_render(&self) {
        self.update(|metrics| metrics.renders += 1);
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }

    fn update(&self, apply: impl FnOnce(&mut Metrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
