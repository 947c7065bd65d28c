//! Table formatting utilities for CLI output.

use comfy_table::{presets, ContentArrangement, Table};
use rill::HandlerType;

/// A registered directive as shown by `rill directives`.
pub struct DirectiveRow {
    /// Tag as written with its default prefix (e.g., "f:if").
    pub tag: String,
    /// Handler type.
    pub handler_type: HandlerType,
}

/// Format registered directives as an ASCII table.
pub fn format_directive_table(rows: &[DirectiveRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Directive", "Arguments", "Compiles", "Parse hook"]);

    for row in rows {
        let capabilities = row.handler_type.capabilities();
        table.add_row(vec![
            row.tag.clone(),
            argument_summary(&row.handler_type),
            yes_no(capabilities.compiles).to_string(),
            yes_no(capabilities.parse_hook).to_string(),
        ]);
    }

    table
}

/// Renders the argument contract as `name: type` pairs; required ones get a `*`.
pub fn argument_summary(handler_type: &HandlerType) -> String {
    handler_type
        .arguments()
        .iter()
        .map(|definition| {
            let marker = if definition.required { "*" } else { "" };
            format!("{}{}: {}", definition.name, marker, definition.kind)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
