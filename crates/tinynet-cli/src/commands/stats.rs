//! Node counts of the loaded net

use serde::Serialize;
use tinynet_core::IngestStats;

use crate::output::{simple_table, to_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Serialize)]
struct StatsReport<'a> {
    ingest: &'a IngestStats,
    nodes: usize,
    types: Vec<TypeCount<'a>>,
}

#[derive(Serialize)]
struct TypeCount<'a> {
    entity_type: &'a str,
    table: &'a str,
    nodes: usize,
}

pub fn run(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let types: Vec<TypeCount> = ctx
        .net
        .descriptors()
        .filter_map(|d| {
            d.entity_type.as_deref().map(|t| TypeCount {
                entity_type: t,
                table: &d.table,
                nodes: ctx.net.node_count(t),
            })
        })
        .collect();

    match OutputFormat::from(cli.format.as_str()) {
        OutputFormat::Json => {
            let report = StatsReport {
                ingest: &ctx.ingested,
                nodes: ctx.net.len(),
                types,
            };
            println!("{}", to_json(&report)?);
        }
        OutputFormat::Table => {
            if cli.quiet {
                return Ok(());
            }
            println!(
                "Ingested {} rows into {} nodes ({} new, {} merged)",
                ctx.ingested.rows,
                ctx.net.len(),
                ctx.ingested.inserted,
                ctx.ingested.merged
            );
            let rows: Vec<Vec<String>> = types
                .iter()
                .map(|t| vec![t.entity_type.to_string(), t.table.to_string(), t.nodes.to_string()])
                .collect();
            println!("{}", simple_table(&["type", "table", "nodes"], &rows));
        }
    }
    Ok(())
}
