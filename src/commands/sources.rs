use clap::Args;
use patchkit::log_status;
use serde::Serialize;

use patchkit::cache::SourceListCache;
use patchkit::github::{self, RepoListingError};

use super::{CmdResult, Context};

#[derive(Args)]
pub struct SourcesArgs {
    /// Query the repositories again instead of using the stored list
    #[arg(long)]
    refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct SourcesOutput {
    command: String,
    default_repository: String,
    sources: Vec<String>,
    /// True when the list came from the cache instead of the repositories.
    cached: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<RepoListingError>,
}

pub fn run(args: SourcesArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<SourcesOutput> {
    let ctx = Context::load()?;
    let clients = ctx.clients.clients(&ctx.repos.repositories);
    let memo = SourceListCache::default();

    log_status!("sources", "Listing revisions of {} repositories", clients.len());
    let listing = github::discover_sources(
        &clients,
        &memo,
        Some(ctx.clients.cache().as_ref()),
        args.refresh,
    );

    Ok((
        SourcesOutput {
            command: "sources".to_string(),
            default_repository: ctx.repos.default_repo().to_string(),
            sources: listing.sources,
            cached: listing.cached,
            errors: listing.errors,
        },
        0,
    ))
}
