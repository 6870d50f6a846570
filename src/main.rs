use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use typewatch::Config;
use typewatch::channels::{DiscordGateway, DiscordRest};
use typewatch::scope::ScopeGate;
use typewatch::tracker::{Event, PhraseBank, Tracker};

#[derive(Parser, Debug)]
#[command(
    name = "typewatch",
    version,
    about = "Narrates typing activity in Discord channels"
)]
struct Cli {
    /// Config file path (defaults to ~/.typewatch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::load(cli.config.as_deref())?;
    if config.bot_token.is_empty() {
        bail!("No Discord token specified! Set DISCORD_TOKEN or bot_token in the config file.");
    }

    let scope = ScopeGate::load(&config.active_guilds_path);
    let sink = Arc::new(DiscordRest::new(config.bot_token.clone()));

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let tracker = Tracker::new(
        scope,
        PhraseBank::new(),
        sink,
        events_tx.clone(),
        config.stop_after(),
        config.stale_after(),
    );

    // The gateway normalizes platform events; a forwarder folds them onto
    // the tracker's serialized queue.
    let gateway = DiscordGateway::new(config.bot_token.clone());
    let (gateway_tx, mut gateway_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        if let Err(e) = gateway.listen(gateway_tx).await {
            tracing::error!("Discord gateway exited: {e}");
        }
    });
    tokio::spawn(async move {
        while let Some(event) = gateway_rx.recv().await {
            if events_tx.send(Event::Gateway(event)).is_err() {
                break;
            }
        }
    });

    info!("typewatch ready");

    tokio::select! {
        () = tracker.run(events_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
