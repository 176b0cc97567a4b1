//! hostcfg agent
//!
//! Searches for and installs operating system updates through the Windows
//! Update Agent and prints the results as JSON.

use clap::Parser;
use color_eyre::Result;
use hostcfg_wua::WuaAgent;
use tracing::{debug, warn};

mod cli;
mod commands;
mod config;
mod logging;

use cli::{Cli, Command};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::load_default(cli.config.as_deref())?;
    logging::init(&config.agent, cli.log_level.as_deref())?;
    debug!(?config, "loaded configuration");

    if cli.command == Command::Config {
        print!("{}", commands::render_config(&config)?);
        return Ok(());
    }

    let agent = WuaAgent::platform()?;
    let output = commands::execute(&agent, &cli.command, &config).await?;
    println!("{}", output.body);

    if output.failed > 0 {
        warn!(failed = output.failed, "some updates failed to install");
        eyre::bail!("{} update(s) failed to install", output.failed);
    }
    Ok(())
}
