use anyhow::Result;
use clap::Parser;

use carton::{commands, Carton};
use carton_config::ConfigManager;
use cli_interface::Cli;
use logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut overrides = Vec::new();
    if let Some(level) = &cli.log_level {
        overrides.push(("log.level", level.as_str()));
    }
    let config = ConfigManager::load(cli.config.as_deref(), &overrides)?;
    let _guard = init_logging(&config.settings()?.log)?;

    let carton = Carton::new(config)?;
    let mut stdout = std::io::stdout();
    commands::run(&carton, cli.command, &mut stdout).await
}
