use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use line_relay::attachments::ContentStager;
use line_relay::{ApiServer, ApiState, Config, RelayContext, RelayMode};

/// Longest interval between download sweeps
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// LINE Relay - echo or forward LINE bot messages
#[derive(Parser)]
#[command(name = "line-relay", version, about)]
struct Cli {
    /// Port to listen on (overrides `PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// Relay mode (overrides `RELAY_MODE`)
    #[arg(short, long, value_enum)]
    mode: Option<RelayMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration and report what would run
    Check,
    /// Delete staged downloads older than the given age and exit
    Sweep {
        /// Maximum age in seconds
        #[arg(long, default_value = "86400")]
        max_age: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,line_relay=info",
        1 => "info,line_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        // Keep a defaulted base URL pointing at the port actually bound
        if config.app_base_url == format!("http://localhost:{}", config.port) {
            config.app_base_url = format!("http://localhost:{port}");
        }
        config.port = port;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
        config.validate()?;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Check) => return cmd_check(&config),
        Some(Command::Sweep { max_age }) => return cmd_sweep(&config, max_age).await,
        None => {}
    }

    tracing::info!(mode = %config.mode, port = config.port, "starting line relay");

    let relay = RelayContext::from_config(&config)?;
    if !relay.converter().is_available() {
        tracing::warn!(
            program = %config.preview.program,
            "preview converter not found, image and video echoes will fail"
        );
    }

    let _sweeper = config.download_retention.map(|retention| {
        let interval = retention.min(MAX_SWEEP_INTERVAL);
        tracing::info!(
            retention_secs = retention.as_secs(),
            interval_secs = interval.as_secs(),
            "download sweeping enabled"
        );
        relay.stager().spawn_sweeper(retention, interval)
    });

    let state = ApiState {
        channel_secret: config.line.channel_secret.clone(),
        relay: Arc::new(relay),
        static_dir: config.static_dir.clone(),
    };

    ApiServer::new(state, config.port).run().await?;

    Ok(())
}

/// Print the resolved configuration
fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let relay = RelayContext::from_config(config)?;

    println!("Mode:          {}", config.mode);
    println!("Port:          {}", config.port);
    println!("Base URL:      {}", config.app_base_url);
    println!("Static dir:    {}", config.static_dir.display());
    println!("Download dir:  {}", relay.stager().dir().display());
    match config.download_retention {
        Some(d) => println!("Retention:     {}s", d.as_secs()),
        None => println!("Retention:     keep forever"),
    }
    println!(
        "Converter:     {} ({})",
        config.preview.program,
        if relay.converter().is_available() {
            "found"
        } else {
            "not found"
        }
    );
    if let Some(discord) = &config.discord {
        println!("Discord hook:  {}", discord.webhook_id);
    }
    if !config.allowed_group_ids.is_empty() {
        println!("Groups:        {}", config.allowed_group_ids.join(", "));
    }

    Ok(())
}

/// Sweep the download directory once
async fn cmd_sweep(config: &Config, max_age: u64) -> anyhow::Result<()> {
    let stager = ContentStager::new(&config.download_dir)?;
    let removed = stager.sweep(Duration::from_secs(max_age)).await?;
    println!("Removed {removed} file(s) from {}", stager.dir().display());
    Ok(())
}
