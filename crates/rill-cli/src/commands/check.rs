//! Implementation of the `rill check` command.

use std::fs::read_to_string;
use std::path::PathBuf;

use miette::{miette, Report};
use owo_colors::OwoColorize;
use rill::{analyze, parse, Compiler, DirectiveResolver};
use serde::Serialize;

use crate::output::TemplateDiagnostic;

/// Arguments for the check command.
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Template files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// JSON output for one checked file.
#[derive(Debug, Serialize)]
struct CheckJson {
    file: String,
    error: Option<String>,
    warnings: Vec<String>,
    compiles: bool,
}

/// Run the check command.
pub fn run_check(args: CheckArgs) -> miette::Result<i32> {
    let resolver = DirectiveResolver::with_defaults();
    let compiler = Compiler::new(&resolver);
    let mut results = Vec::with_capacity(args.files.len());
    let mut failed = false;

    for path in &args.files {
        let content = read_to_string(path)
            .map_err(|e| miette!("Cannot read template {}: {}", path.display(), e))?;
        let identity = path.display().to_string();

        let (error, warnings, compiles) = match parse(&content, &identity, &resolver) {
            Ok(template) => {
                let warnings: Vec<String> = analyze(&template, &resolver)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                (None, warnings, compiler.compile(&template).is_some())
            }
            Err(e) => {
                if !args.json {
                    let diagnostic = TemplateDiagnostic::from_parse_error(path, &content, &e);
                    eprintln!("{:?}", Report::new(diagnostic));
                }
                (Some(e.to_string()), Vec::new(), false)
            }
        };

        failed |= error.is_some() || (args.strict && !warnings.is_empty());
        if !args.json {
            for warning in &warnings {
                eprintln!("{} {}: {}", "warning:".yellow().bold(), identity, warning);
            }
            if error.is_none() {
                let mode = if compiles { "compiled" } else { "interpreted" };
                println!("{} {} ({})", "ok".green(), identity, mode.dimmed());
            }
        }
        results.push(CheckJson {
            file: identity,
            error,
            warnings,
            compiles,
        });
    }

    if args.json {
        let json = serde_json::to_string_pretty(&results)
            .map_err(|e| miette!("Failed to serialize results: {}", e))?;
        println!("{}", json);
    }

    Ok(if failed {
        exitcode::DATAERR
    } else {
        exitcode::OK
    })
}
