//! Evaluate named queries from the net definition

use std::collections::BTreeMap;

use anyhow::{anyhow, bail};
use clap::Args;
use serde::Serialize;
use tinynet_core::{NodeKey, Record, TraversalStats};

use crate::output::{records_table, to_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct QueryArgs {
    /// Query name
    pub name: String,

    /// Start node as `Type:id`; required when the query starts with a child step
    #[arg(long = "from")]
    pub from: Vec<String>,

    /// Bypass the traversal cache
    #[arg(long)]
    pub no_cache: bool,

    /// Print traversal statistics
    #[arg(long)]
    pub stats: bool,
}

#[derive(Serialize)]
struct QueryReport<'a> {
    query: &'a str,
    selected: BTreeMap<&'a str, Vec<&'a Record>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a TraversalStats>,
}

fn parse_start(raw: &str) -> anyhow::Result<NodeKey> {
    match raw.split_once(':') {
        Some((entity_type, id)) if !entity_type.is_empty() && !id.is_empty() => {
            Ok(NodeKey::new(entity_type, id))
        }
        _ => bail!("Start node '{}' must look like Type:id", raw),
    }
}

pub fn run(args: &QueryArgs, cli: &Cli, ctx: &mut AppContext) -> anyhow::Result<()> {
    let definition = ctx
        .file
        .query(&args.name)
        .ok_or_else(|| anyhow!("No query named '{}' in the net definition", args.name))?;
    let path = definition.to_path()?;
    let start = args
        .from
        .iter()
        .map(|raw| parse_start(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if args.no_cache {
        ctx.net.set_cacheable(false);
    }
    let result = ctx.net.evaluate(&path, &start)?;
    tracing::info!("Query '{}' selected {} nodes", args.name, result.total());

    let net = &ctx.net;
    let selected: BTreeMap<&str, Vec<&Record>> = result
        .iter()
        .map(|(entity_type, ids)| {
            let records = ids
                .iter()
                .filter_map(|id| net.node(entity_type, id))
                .map(|node| node.entity())
                .collect();
            (entity_type, records)
        })
        .collect();

    match OutputFormat::from(cli.format.as_str()) {
        OutputFormat::Json => {
            let report = QueryReport {
                query: &args.name,
                selected,
                stats: args.stats.then(|| net.last_stats()),
            };
            println!("{}", to_json(&report)?);
        }
        OutputFormat::Table => {
            if result.is_empty() {
                println!("Query '{}' selected nothing", args.name);
            }
            for (entity_type, records) in selected.iter().filter(|(_, r)| !r.is_empty()) {
                println!("{} ({}):", entity_type, records.len());
                println!("{}", records_table(records));
                println!();
            }
            if args.stats {
                let stats = net.last_stats();
                println!(
                    "steps: {}, candidates: {}, cache hits: {}, cache writes: {}",
                    stats.steps, stats.candidates_checked, stats.cache_hits, stats.cache_writes
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        assert_eq!(parse_start("User:1").unwrap(), NodeKey::new("User", "1"));
        assert_eq!(parse_start("Order:a:b").unwrap(), NodeKey::new("Order", "a:b"));
        assert!(parse_start("User").is_err());
        assert!(parse_start(":1").is_err());
    }
}
