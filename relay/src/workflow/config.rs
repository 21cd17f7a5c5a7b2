use anyhow::Context;
use sacmescore::prelude::{AcquisitionMode, AnalysisScopeParams, RenderTarget};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

fn default_targets() -> RenderTarget {
    RenderTarget {
        trend_plot: "trend-plot".into(),
        sweep_plot: "sweep-plot".into(),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub scope: AnalysisScopeParams,
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_targets")]
    pub targets: RenderTarget,
}

impl SessionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading session config {}", path_ref.display()))?;
        let config: SessionConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing session config {}", path_ref.display()))?;
        config
            .scope
            .validate()
            .with_context(|| format!("validating session config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        num_files: usize,
        frequencies: &[u32],
        electrodes: &[u16],
        sweep: bool,
    ) -> anyhow::Result<Self> {
        let mut scope = AnalysisScopeParams::new(num_files, frequencies.iter().copied());
        scope.selected_electrodes = electrodes.iter().copied().collect();
        if sweep {
            scope.mode = AcquisitionMode::Sweep;
        }
        scope.validate().context("validating command-line session")?;
        Ok(Self {
            scope,
            bind: default_bind(),
            targets: default_targets(),
        })
    }
}
