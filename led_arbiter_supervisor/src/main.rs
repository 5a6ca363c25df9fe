use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use led_arbiter_core::{ArbitrationEngine, CatalogCfg};
use led_arbiter_supervisor::{forward_lines, logging, ConsoleOutput, IndicatorSupervisor, Result};
use tokio::io::BufReader;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Arbitrate competing indicator requests onto one signal LED.
#[derive(Parser, Debug)]
#[command(name = "led-arbiter", version, about)]
struct Args {
    /// TOML catalog; the built-in catalog is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to a daily rolling file in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the catalog in priority order and exit
    #[arg(long)]
    print_catalog: bool,
}

fn print_catalog(cfg: &CatalogCfg) {
    for (i, ind) in cfg.indicators.iter().enumerate() {
        println!("{:>2}  {:<16} {:?}", i + 1, ind.id, ind.pattern);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_dir.as_deref())?;

    let cfg = match &args.config {
        Some(path) => CatalogCfg::load(path)?,
        None => CatalogCfg::default(),
    };
    if args.print_catalog {
        print_catalog(&cfg);
        return Ok(());
    }

    let engine = ArbitrationEngine::new(&cfg, Arc::new(ConsoleOutput::new()), Handle::current())?;
    let supervisor = IndicatorSupervisor::new(Arc::new(engine));

    print_catalog(&cfg);
    println!("number = toggle, +id / -id = request / release, q = quit");

    let (tx, rx) = mpsc::channel(16);
    let reader = tokio::spawn(forward_lines(BufReader::new(tokio::io::stdin()), tx));

    let stats = supervisor.run(rx).await;
    tracing::info!(applied = stats.applied, rejected = stats.rejected, "input closed");

    match reader.await {
        Ok(res) => res?,
        Err(e) => tracing::warn!("input reader failed: {e}"),
    }
    supervisor.shutdown()
}
