//! List entities of one type

use clap::Args;

use crate::output::{records_table, to_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct NodesArgs {
    /// Entity type
    pub entity_type: String,

    /// Limit results
    #[arg(short, long, default_value = "100")]
    pub limit: usize,
}

pub fn run(args: &NodesArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    if ctx.net.descriptor(&args.entity_type).is_none() {
        anyhow::bail!("Entity type '{}' is not registered", args.entity_type);
    }
    let records: Vec<_> = ctx.net.entities(&args.entity_type).take(args.limit).collect();
    tracing::info!("Listing {} {} entities", records.len(), args.entity_type);

    match OutputFormat::from(cli.format.as_str()) {
        OutputFormat::Json => println!("{}", to_json(&records)?),
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No {} entities loaded", args.entity_type);
            } else {
                println!("{}", records_table(&records));
            }
        }
    }
    Ok(())
}
