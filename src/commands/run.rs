use std::sync::Arc;

use clap::Args;
use patchkit::log_status;

use patchkit::cache::ScriptCache;
use patchkit::engine::{Engine, ExecutionEvent, ExecutionReport};
use patchkit::source::{ActionProvider, LOCAL_SOURCE};
use patchkit::ssh::{Credentials, SshConnector, Target};

use super::{CmdResult, Context};

#[derive(Args)]
pub struct RunArgs {
    /// Device address
    #[arg(long)]
    host: String,

    /// Title of the action to run
    #[arg(long)]
    action: String,

    /// Source selector: local, owner/name@rev, "[owner/name] rev" or a bare revision
    #[arg(long, short, default_value = LOCAL_SOURCE)]
    source: String,

    /// SSH port (defaults to the configured port)
    #[arg(long)]
    port: Option<u16>,

    /// Login user (defaults to the catalog's username)
    #[arg(long)]
    user: Option<String>,

    /// Login password (defaults to the catalog's password)
    #[arg(long)]
    password: Option<String>,
}

fn render(event: ExecutionEvent) {
    match event {
        ExecutionEvent::PreloadStarted { scripts } if scripts > 0 => {
            log_status!("preload", "Resolving {} scripts", scripts)
        }
        ExecutionEvent::ScriptPreloadFailed { script, error } => {
            log_status!("preload", "{} unavailable: {}", script, error)
        }
        ExecutionEvent::PreloadFinished { loaded, failed } if failed > 0 => {
            log_status!("preload", "{} loaded, {} failed", loaded, failed)
        }
        ExecutionEvent::Connecting { target } => log_status!("run", "Connecting to {}", target),
        ExecutionEvent::StepStarted { index, total, title } => {
            log_status!("run", "[{}/{}] {}", index + 1, total, title)
        }
        ExecutionEvent::StepFinished {
            completed,
            total,
            title,
            passed: false,
        } => log_status!("run", "{} failed ({}/{} succeeded)", title, completed, total),
        ExecutionEvent::Finished { summary, .. } => log_status!("run", "{}", summary),
        _ => {}
    }
}

pub fn run(args: RunArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ExecutionReport> {
    let ctx = Context::load()?;
    let selector = ctx.selector(&args.source)?;
    let source = ctx.source(&selector);

    let catalog = source.load_catalog()?;
    let action = catalog.find_action(&args.action, &source.source_name())?;

    let credentials = Credentials::new(
        args.user.unwrap_or_else(|| catalog.username.clone()),
        args.password.unwrap_or_else(|| catalog.password.clone()),
    );
    let target = Target::new(args.host, args.port.unwrap_or(ctx.config.defaults.ssh.port));

    let engine = Engine::new(
        Arc::new(source),
        Arc::new(SshConnector::new(ctx.config.defaults.ssh.clone())),
        Arc::new(ScriptCache::default()),
    )
    .with_sink(Arc::new(render));

    let report = engine.run(action, &target, &credentials).into_result()?;
    Ok((report, 0))
}
