use anyhow::Context;
use clap::Parser;
use generator::profile::{build_session_events, GeneratorConfig, HoldLabels};
use gui_bridge::bridge::GuiBridge;
use std::fs;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::SessionConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Live trend relay for square-wave voltammetry sessions")]
struct Args {
    /// Load the session scope from YAML
    #[arg(long)]
    session: Option<PathBuf>,
    #[arg(long, default_value_t = 10)]
    num_files: usize,
    #[arg(long, value_delimiter = ',', default_values_t = [15, 200])]
    frequencies: Vec<u32>,
    /// 0-based electrode channels; empty means the averaged channel
    #[arg(long, value_delimiter = ',')]
    electrodes: Vec<u16>,
    /// Run a frequency sweep instead of a continuous file series
    #[arg(long, default_value_t = false)]
    sweep: bool,
    /// Replay a synthetic run through the session and print a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Hold the first sweep under this label during an offline sweep run
    #[arg(long)]
    hold: Option<String>,
    /// Write the session as CSV after the offline run
    #[arg(long)]
    export: Option<PathBuf>,
    /// Keep the HTTP bridge alive for incoming events
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let session_config = if let Some(path) = args.session {
        SessionConfig::load(path)?
    } else {
        SessionConfig::from_args(args.num_files, &args.frequencies, &args.electrodes, args.sweep)?
    };

    let runner = Runner::new(session_config.clone());
    let bridge = GuiBridge::new(&runner)?;

    if args.offline {
        let generator = GeneratorConfig {
            seed: args.seed,
            hold: args.hold.map(|held| HoldLabels {
                held,
                current: "Current".into(),
            }),
            ..Default::default()
        };
        let events = build_session_events(&session_config.scope, &generator);
        let result = bridge.with_gateway(|gateway| runner.execute(gateway, events));

        println!(
            "Offline run -> accepted {}, rejected {}, renders {}, latest KDM {}, sweep complete {}, holding {}",
            result.accepted,
            result.rejected,
            result.renders,
            result
                .latest_kdm
                .map(|kdm| format!("{:.2}", kdm))
                .unwrap_or_else(|| "-".into()),
            result.sweep_complete,
            result.holding
        );
        for line in &result.diagnostics {
            println!("  diagnostic: {}", line);
        }
        bridge.publish_status("Offline session results ready.");
    }

    if let Some(path) = args.export {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating export directory {}", parent.display()))?;
        }
        let csv = bridge.export_csv()?;
        fs::write(&path, csv).with_context(|| format!("writing export {}", path.display()))?;
        println!("Exported session to {}", path.display());
    }

    if args.serve {
        bridge.serve(session_config.bind)?;
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
