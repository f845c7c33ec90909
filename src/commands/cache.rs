use clap::{Args, Subcommand};
use serde::Serialize;

use patchkit::cache::{CacheStats, ClearResult, ContentCache};
use patchkit::defaults;

use super::CmdResult;

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Show entry counts and size of the download cache
    Status,
    /// Delete every cached download
    Clear,
    /// Show the cache directory
    Path,
}

#[derive(Debug, Serialize)]
pub struct CacheOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<CacheStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cleared: Option<ClearResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

pub fn run(args: CacheArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<CacheOutput> {
    let dir = defaults::load_config().defaults.cache.resolved_dir();

    let output = match args.command {
        CacheCommand::Status => CacheOutput {
            command: "cache.status".to_string(),
            stats: Some(ContentCache::open(&dir)?.stats()?),
            cleared: None,
            path: None,
        },
        CacheCommand::Clear => CacheOutput {
            command: "cache.clear".to_string(),
            stats: None,
            cleared: Some(ContentCache::open(&dir)?.clear()?),
            path: None,
        },
        CacheCommand::Path => CacheOutput {
            command: "cache.path".to_string(),
            stats: None,
            cleared: None,
            path: Some(dir.display().to_string()),
        },
    };

    Ok((output, 0))
}
