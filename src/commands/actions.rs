use clap::Args;
use patchkit::log_status;
use serde::Serialize;

use patchkit::catalog::Catalog;
use patchkit::source::{ActionProvider, LOCAL_SOURCE};

use super::{CmdResult, Context};

#[derive(Args)]
pub struct ActionsArgs {
    /// Source selector: local, owner/name@rev, "[owner/name] rev" or a bare revision
    #[arg(long, short, default_value = LOCAL_SOURCE)]
    source: String,
}

#[derive(Debug, Serialize)]
pub struct ActionSummary {
    title: String,
    description: String,
    steps: usize,
    scripts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionsOutput {
    command: String,
    source: String,
    username: String,
    actions: Vec<ActionSummary>,
}

pub fn summarize(catalog: &Catalog) -> Vec<ActionSummary> {
    catalog
        .actions
        .iter()
        .map(|action| ActionSummary {
            title: action.title.clone(),
            description: action.description.clone(),
            steps: action.steps.len(),
            scripts: action.script_refs().into_iter().map(str::to_string).collect(),
        })
        .collect()
}

pub fn run(args: ActionsArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ActionsOutput> {
    let ctx = Context::load()?;
    let selector = ctx.selector(&args.source)?;
    let source = ctx.source(&selector);

    log_status!("actions", "Loading catalog from {}", selector);
    let catalog = source.load_catalog()?;

    Ok((
        ActionsOutput {
            command: "actions".to_string(),
            source: source.source_name(),
            username: catalog.username.clone(),
            actions: summarize(&catalog),
        },
        0,
    ))
}
