//! Command execution against an update agent

use eyre::WrapErr;
use hostcfg_wua::{UpdateAgent, UpdatePackage};
use serde::Serialize;
use tracing::info;

use crate::cli::Command;
use crate::config::Config;

/// Rendered command output
#[derive(Debug)]
pub struct Output {
    /// Text printed to stdout
    pub body: String,
    /// Number of updates that failed to install
    pub failed: usize,
}

impl Output {
    fn ok(body: String) -> Self {
        Self { body, failed: 0 }
    }
}

/// Updates a dry run would install
#[derive(Debug, Serialize)]
struct DryRun<'a> {
    selected: Vec<&'a UpdatePackage>,
    skipped: Vec<&'a UpdatePackage>,
}

/// Run a command that needs an update agent
///
/// # Errors
/// Returns error if the agent operation fails or the output cannot be rendered
pub async fn execute(
    agent: &dyn UpdateAgent,
    command: &Command,
    config: &Config,
) -> eyre::Result<Output> {
    match command {
        Command::Search { query, pretty } => {
            let query = query.as_deref().unwrap_or(&config.wua.search_query);
            let packages = agent
                .search(query)
                .await
                .wrap_err("failed to search for updates")?;
            info!(count = packages.len(), "found updates");

            let body = if *pretty {
                serde_json::to_string_pretty(&packages)?
            } else {
                serde_json::to_string(&packages)?
            };
            Ok(Output::ok(body))
        }

        Command::Install {
            query,
            update_ids,
            dry_run,
        } => {
            let query = query.as_deref().unwrap_or(&config.wua.search_query);
            let selector = config.wua.selector().with_update_ids(update_ids.iter().cloned());

            if *dry_run {
                let packages = agent
                    .search(query)
                    .await
                    .wrap_err("failed to search for updates")?;
                let (selected, skipped): (Vec<_>, Vec<_>) = packages.iter().partition(|p| selector.matches(p));
                let body = serde_json::to_string_pretty(&DryRun { selected, skipped })?;
                return Ok(Output::ok(body));
            }

            let report = agent
                .install(query, &selector)
                .await
                .wrap_err("failed to install updates")?;
            Ok(Output {
                body: serde_json::to_string_pretty(&report)?,
                failed: report.failed.len(),
            })
        }

        Command::RebootRequired => {
            let required = agent
                .reboot_required()
                .await
                .wrap_err("failed to read reboot state")?;
            Ok(Output::ok(serde_json::json!({ "reboot_required": required }).to_string()))
        }

        Command::Config => Ok(Output::ok(render_config(config)?)),
    }
}

/// Render the effective configuration as TOML
///
/// # Errors
/// Returns error if the configuration cannot be serialized
pub fn render_config(config: &Config) -> eyre::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
