// fanledger daemon
//
// Loads the config, installs logging, then runs the scheduler and the
// dashboard until Ctrl-C.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use fanledger::{App, CollectorConfig, logging};

#[derive(Parser, Debug)]
#[command(name = "fanledger", version, about = "Collect creator notifications into SQLite")]
struct Cli {
    /// JSON config file; missing keys keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker profile id of the signed-in browser
    #[arg(short, long)]
    profile: Option<String>,

    /// SQLite database path
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Dashboard bind address, e.g. 127.0.0.1:5000
    #[arg(short, long)]
    bind: Option<String>,

    /// Skip the collection run at startup
    #[arg(long)]
    no_initial_run: bool,
}

fn load_config(cli: &Cli) -> Result<CollectorConfig> {
    let mut config = match &cli.config {
        Some(path) => CollectorConfig::from_json_file(path)?,
        None => CollectorConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(profile) = &cli.profile {
        config.set_profile_id(profile.clone());
    }
    if let Some(database) = &cli.database {
        config.set_database_path(database.clone());
    }
    if let Some(bind) = &cli.bind {
        config.set_bind_addr(bind.clone());
    }
    if cli.no_initial_run {
        config.set_run_on_startup(false);
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    logging::init(config.log_file())?;
    info!("fanledger {} starting", env!("CARGO_PKG_VERSION"));

    let mut app = App::init(config).await?;
    let served = app.serve().await;
    app.shutdown().await;
    served
}
