use crate::prelude::TrendError;
use log::{info, warn};
use std::collections::VecDeque;

const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 64;

/// Component-tagged logging plus a bounded ring of user-facing diagnostics.
#[derive(Debug, Clone)]
pub struct LogManager {
    component: &'static str,
    recent: VecDeque<String>,
    capacity: usize,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self::with_capacity(component, DEFAULT_DIAGNOSTIC_CAPACITY)
    }

    pub fn with_capacity(component: &'static str, capacity: usize) -> Self {
        Self {
            component,
            recent: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    /// Logs a rejected event and keeps it for display.
    pub fn diagnostic(&mut self, error: &TrendError) {
        warn!("[{}] {}", self.component, error);
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(error.to_string());
    }

    pub fn recent(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("sacmes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_ring_drops_oldest() {
        let mut logger = LogManager::with_capacity("test", 2);
        logger.diagnostic(&TrendError::AlreadyHolding);
        logger.diagnostic(&TrendError::NothingToHold);
        logger.diagnostic(&TrendError::MalformedEventKey("x.txt".into()));
        let recent = logger.recent();
        assert_eq!(recent.len(), 2);
        assert!(recent[1].contains("x.txt"));
    }
}
