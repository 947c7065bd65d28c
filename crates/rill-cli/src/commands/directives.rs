//! Implementation of the `rill directives` command.

use rill::DirectiveResolver;
use serde::Serialize;

use crate::output::table::{argument_summary, format_directive_table, DirectiveRow};

/// Arguments for the directives command.
#[derive(Debug, clap::Args)]
pub struct DirectivesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for one directive.
#[derive(Debug, Serialize)]
struct DirectiveJson {
    tag: String,
    namespace: String,
    arguments: String,
    compiles: bool,
    parse_hook: bool,
}

/// Run the directives command.
pub fn run_directives(args: DirectivesArgs) -> miette::Result<i32> {
    let resolver = DirectiveResolver::with_defaults();
    let namespaces = resolver.namespaces();

    let rows: Vec<DirectiveRow> = resolver
        .handler_types()
        .map(|handler_type| {
            let prefix = namespaces
                .iter()
                .find(|(_, uri)| *uri == handler_type.namespace())
                .map_or(handler_type.namespace(), |(prefix, _)| *prefix);
            DirectiveRow {
                tag: format!("{}:{}", prefix, handler_type.name()),
                handler_type: handler_type.clone(),
            }
        })
        .collect();

    if args.json {
        let output: Vec<DirectiveJson> = rows
            .iter()
            .map(|row| {
                let capabilities = row.handler_type.capabilities();
                DirectiveJson {
                    tag: row.tag.clone(),
                    namespace: row.handler_type.namespace().to_string(),
                    arguments: argument_summary(&row.handler_type),
                    compiles: capabilities.compiles,
                    parse_hook: capabilities.parse_hook,
                }
            })
            .collect();
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| miette::miette!("Failed to serialize directives: {}", e))?;
        println!("{}", json);
    } else {
        println!("{}", format_directive_table(&rows));
    }
    Ok(exitcode::OK)
}
