//! Shell completions for the `tinynet` binary

use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::Cli;

#[derive(Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &CompletionsArgs) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();

    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create completion script {:?}", path))?;
            generate(args.shell, &mut cmd, bin, &mut file);
            tracing::info!("Wrote {} completions to {:?}", args.shell, path);
        }
        None => generate(args.shell, &mut cmd, bin, &mut io::stdout()),
    }
    Ok(())
}
