use std::sync::Arc;

use patchkit::cache::ContentCache;
use patchkit::defaults::{self, PatchkitConfig};
use patchkit::github::ClientFactory;
use patchkit::repo::RepoList;
use patchkit::source::{ActionSource, SourceSelector};

pub type CmdResult<T> = patchkit::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Everything a command needs to reach sources, built once per invocation.
pub(crate) struct Context {
    pub config: PatchkitConfig,
    pub repos: RepoList,
    pub clients: ClientFactory,
}

impl Context {
    pub fn load() -> patchkit::Result<Self> {
        let config = defaults::load_config();
        let repos = config.repo_list();
        let cache = Arc::new(ContentCache::open(config.defaults.cache.resolved_dir())?);
        let clients = ClientFactory::from_config(&config.defaults.github, cache)?;
        Ok(Self {
            config,
            repos,
            clients,
        })
    }

    pub fn selector(&self, source: &str) -> patchkit::Result<SourceSelector> {
        SourceSelector::parse(source, &self.repos.default_repo())
    }

    pub fn source(&self, selector: &SourceSelector) -> ActionSource {
        ActionSource::from_selector(selector, &self.clients)
    }
}

pub mod actions;
pub mod cache;
pub mod config;
pub mod escape;
pub mod run;
pub mod sources;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (patchkit::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Sources(args) => dispatch!(args, global, sources),
        crate::Commands::Actions(args) => dispatch!(args, global, actions),
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Cache(args) => dispatch!(args, global, cache),
        crate::Commands::Config(args) => dispatch!(args, global, config),
        crate::Commands::Escape(args) => dispatch!(args, global, escape),
    }
}
