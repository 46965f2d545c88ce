use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use chadgpt_agent::{build_provider, PromptBuilder};
use chadgpt_bot::{forward_irc_events, Dispatcher, IgnoreFilter};
use chadgpt_core::config::DEFAULT_CONFIG_PATH;
use chadgpt_core::ChadConfig;
use chadgpt_irc::{IrcClient, IrcSender};

const DEFAULT_LOG_FILTER: &str = "chadgpt=info,chadgpt_bot=info,chadgpt_irc=info,chadgpt_agent=info,chadgpt_core=info";

/// IRC bot that answers addressed lines with an LLM.
#[derive(Parser, Debug)]
#[command(name = "chadgpt", version, about, long_about = None)]
struct Args {
    /// Path to config.yaml (or a .toml file)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log filter, e.g. `debug` or `chadgpt_bot=debug,info`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    /// Load and validate the configuration, then exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => tracing_subscriber::EnvFilter::try_new(level)
            .with_context(|| format!("invalid --log-level `{level}'"))?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match ChadConfig::load(&args.config).and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => config,
        Err(e) => {
            error!(code = e.code(), path = %args.config.display(), "{e}");
            return Err(e.into());
        }
    };
    PromptBuilder::new(&config.completion.messages)?;
    IgnoreFilter::new(&config.irc.ignored_nicks).context("irc.ignored_nicks")?;

    if args.check {
        info!(path = %args.config.display(), "configuration OK");
        return Ok(());
    }

    let provider = build_provider(&config.completion)?;

    info!(host = %config.irc.host, port = config.irc.port, "connecting");
    let (irc, irc_events) = IrcClient::connect(&config.irc)
        .await
        .with_context(|| format!("connecting to {}:{}", config.irc.host, config.irc.port))?;

    let dispatcher = Dispatcher::new(&config, provider, Arc::new(irc.clone()))?;
    tokio::spawn(forward_irc_events(irc_events, dispatcher.handle()));

    tokio::select! {
        result = dispatcher.run() => {
            if let Err(e) = &result {
                error!(error = %e, "event loop stopped");
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; quitting");
            irc.quit(Some("shutting down"));
            // Give the connection task a moment to flush QUIT.
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    Ok(())
}
