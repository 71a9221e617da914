use bookcover::cli::commands::{
    RunOptions, cmd_control, cmd_filter, cmd_hide, cmd_regions, cmd_scan,
};
use bookcover::cli::config::{Cli, Commands, load_config};
use bookcover::cli::logging::init_logging;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref());

    // CLI > config file > defaults
    let options = RunOptions {
        selectors: cli.selectors.clone(),
        timeout_ms: cli.timeout_ms,
    };

    match cli.command {
        Commands::Scan { snapshot, passes } => {
            cmd_scan(&config, &options, &snapshot, passes).await?;
        }
        Commands::Filter { snapshot, region } => {
            cmd_filter(&config, &options, &snapshot, &region).await?;
        }
        Commands::Hide { snapshot } => {
            cmd_hide(&config, &options, &snapshot).await?;
        }
        Commands::Control { snapshot, request } => {
            let success = cmd_control(&config, &options, &snapshot, &request).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Regions => {
            cmd_regions(&config, &options).await?;
        }
    }

    Ok(())
}
