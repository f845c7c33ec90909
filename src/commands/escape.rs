use std::io::BufRead;

use clap::Args;
use serde::Serialize;

use patchkit::validate::literal_pattern;
use patchkit::Error;

use super::CmdResult;

#[derive(Args)]
pub struct EscapeArgs {
    /// Text to match literally (reads one line from stdin when omitted)
    text: Option<String>,

    /// Anchor the pattern so the whole output must equal the text
    #[arg(long)]
    exact: bool,
}

#[derive(Debug, Serialize)]
pub struct EscapeOutput {
    command: String,
    input: String,
    /// Value for a step's `expected` field.
    pattern: String,
    /// The same pattern as a double-quoted YAML scalar.
    yaml: String,
}

fn yaml_double_quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn read_stdin_line() -> patchkit::Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Error::internal_io(e.to_string(), Some("read stdin".to_string())))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn run(args: EscapeArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<EscapeOutput> {
    let input = match args.text {
        Some(text) => text,
        None => read_stdin_line()?,
    };
    if input.trim().is_empty() {
        return Err(Error::validation_invalid_argument(
            "text",
            "Nothing to escape",
            None,
            None,
        ));
    }

    let pattern = literal_pattern(&input, args.exact);
    Ok((
        EscapeOutput {
            command: "escape".to_string(),
            yaml: yaml_double_quoted(&pattern),
            input,
            pattern,
        },
        0,
    ))
}
