use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use workflow::config::MonitorConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod sources;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Live road-station speed monitor")]
struct Args {
    /// Load a monitor config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read station metadata from a GeoJSON file instead of the HTTP API
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Replace the broker with a synthetic telemetry feed
    #[arg(long, default_value_t = false)]
    simulate: bool,
    /// Seed for the synthetic feed and catalog
    #[arg(long)]
    seed: Option<u64>,
    /// Address for the map bridge
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.config {
        MonitorConfig::load(path)?
    } else {
        MonitorConfig::default()
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let runner = Runner::new(config, args.catalog, args.simulate);
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating monitor runtime")?;

    runtime.block_on(async {
        let shutdown = CancellationToken::new();
        let on_signal = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = signal::ctrl_c().await {
                warn!("cannot listen for Ctrl+C: {}", err);
                return;
            }
            info!("Ctrl+C received, shutting down");
            on_signal.cancel();
        });

        let summary = runner.run(shutdown).await?;
        println!(
            "Monitor stopped -> stations {}, visible {}, applied {}, filtered {}, \
             out_of_view {}, malformed {}, recomputes {} (bridge was {})",
            summary.stations,
            summary.visible,
            summary.metrics.applied,
            summary.metrics.filtered,
            summary.metrics.out_of_view,
            summary.metrics.malformed,
            summary.metrics.recomputes,
            summary.bridge
        );
        Ok::<(), anyhow::Error>(())
    })
}
