use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tokio::sync::watch;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cryptowatch_sentinel::blockchain::mempool::MempoolSpaceFetcher;
use cryptowatch_sentinel::config::Config;
use cryptowatch_sentinel::escalation::EscalationMachine;
use cryptowatch_sentinel::whitelist::WhitelistFilter;

/// Host-resident cryptojacking sentinel.
#[derive(Parser, Debug)]
#[command(name = "sentryd")]
struct Cli {
    /// Start the monitoring daemon loop.
    #[arg(short, long)]
    monitor: bool,

    #[arg(long, default_value = "config/sentinel.yaml")]
    config: PathBuf,

    #[arg(long, default_value = "config/whitelist.yaml")]
    whitelist: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if !cli.monitor {
        Cli::command().print_help()?;
        println!();
        std::process::exit(1);
    }

    let config = Config::load(&cli.config).map_err(|e| {
        error!(error = %e, "configuration error");
        anyhow::anyhow!(e.to_string())
    })?;

    let whitelist = WhitelistFilter::from_file(&cli.whitelist).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "whitelist file unavailable, proceeding with an empty whitelist");
        WhitelistFilter::new(Default::default())
    });

    let header_source = Box::new(MempoolSpaceFetcher::new(
        config.blockchain.header_endpoint.clone(),
        Duration::from_secs(config.blockchain.request_timeout_seconds),
    ));

    let mut machine = EscalationMachine::new(config, whitelist, header_source);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = cancel_tx.send(true);
    });

    machine.run(cancel_rx).await;
    Ok(())
}
