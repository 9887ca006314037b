mod cli;
mod commands;
mod config;
mod constants;
mod error;
mod http;
mod install;
mod lock;
mod releases;
mod ui;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use log::LevelFilter;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.debug {
                ui::error(&format!("{:?}", e));
            } else {
                ui::error(&format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let config = Config::load()?;
    log::debug!(
        "Home {}, install dir {}",
        config.home.display(),
        config.install_dir.display()
    );

    match command {
        Commands::List { refresh } => commands::list::list(&config, refresh).await,
        Commands::Install(args) => {
            commands::install::install(
                &config,
                args.source,
                args.version.as_deref(),
                args.sha256.as_deref(),
            )
            .await
        }
        Commands::Init => commands::init::init(&config),
        Commands::Version => commands::version::version(&config),
    }
}
