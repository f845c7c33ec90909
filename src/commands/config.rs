use clap::{Args, Subcommand};
use serde::Serialize;

use patchkit::defaults::{self, PatchkitConfig};
use patchkit::repo::RepoIdentity;

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display configuration (merged defaults + file)
    Show {
        /// Show only built-in defaults (ignore patchkit.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Show the path to patchkit.json
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PatchkitConfig>,
    /// Repositories in effect after falling back to the bundled list.
    #[serde(skip_serializing_if = "Option::is_none")]
    repositories: Option<Vec<RepoIdentity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
}

pub fn run(args: ConfigArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin),
        ConfigCommand::Path => path(),
    }
}

fn show(builtin: bool) -> CmdResult<ConfigOutput> {
    let config = if builtin {
        PatchkitConfig::default()
    } else {
        defaults::load_config()
    };
    let repositories = config.repo_list().repositories;

    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            config: Some(config),
            repositories: Some(repositories),
            path: None,
            exists: None,
        },
        0,
    ))
}

fn path() -> CmdResult<ConfigOutput> {
    Ok((
        ConfigOutput {
            command: "config.path".to_string(),
            config: None,
            repositories: None,
            path: Some(defaults::config_path()?),
            exists: Some(defaults::config_exists()),
        },
        0,
    ))
}
