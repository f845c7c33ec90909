use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{actions, cache, config, escape, run, sources};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const LOG_ENV: &str = "PATCHKIT_LOG";

#[derive(Parser)]
#[command(name = "patchkit")]
#[command(version = VERSION)]
#[command(about = "Run scripted maintenance actions on devices over SSH")]
struct Cli {
    /// Log more (-v info, -vv debug). PATCHKIT_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available sources across configured repositories
    Sources(sources::SourcesArgs),
    /// List the actions offered by a source
    Actions(actions::ActionsArgs),
    /// Run an action against a device
    Run(run::RunArgs),
    /// Inspect or clear the download cache
    Cache(cache::CacheArgs),
    /// Show patchkit configuration
    Config(config::ConfigArgs),
    /// Turn literal text into an `expected` pattern
    Escape(escape::EscapeArgs),
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("patchkit={},reqwest=warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let global = GlobalArgs {};
    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
