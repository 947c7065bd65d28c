//! Implementation of the `rill render` command.

use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::{miette, Report};
use rill::{Engine, FileSystemLoader, RenderConfig, Renderable, Value, Variables};
use serde::Serialize;
use serde_json::Value as Json;

use crate::output::TemplateDiagnostic;

/// Arguments for the render command.
#[derive(Debug, clap::Args)]
pub struct RenderArgs {
    /// Template file to render
    pub file: PathBuf,

    /// Variables in name=value format (repeatable); values are parsed as JSON
    /// and fall back to plain strings
    #[arg(long = "var", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// JSON file with an object of variables
    #[arg(long)]
    pub vars_file: Option<PathBuf>,

    /// JSON file with render settings
    #[arg(long, env = "RILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory partials are loaded from. Defaults to the template's directory.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Interpret the syntax tree instead of compiling
    #[arg(long)]
    pub interpret: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for render results.
#[derive(Serialize)]
pub struct RenderResult {
    pub output: String,
    pub compiled: bool,
}

/// Parse a key=value variable string.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid variable format '{}': expected name=value", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Converts a JSON value to a template value.
fn json_to_value(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Number(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::List(items.into_iter().map(json_to_value).collect()),
        Json::Object(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key, json_to_value(value)))
                .collect(),
        ),
    }
}

fn read_json(path: &Path, what: &str) -> miette::Result<Json> {
    let content = read_to_string(path)
        .map_err(|e| miette!("Cannot read {} file {}: {}", what, path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| miette!("Invalid JSON in {} file {}: {}", what, path.display(), e))
}

fn collect_variables(args: &RenderArgs) -> miette::Result<Variables> {
    let mut variables = Variables::new();
    if let Some(path) = &args.vars_file {
        match read_json(path, "variables")? {
            Json::Object(entries) => {
                for (key, value) in entries {
                    variables.insert(key, json_to_value(value));
                }
            }
            _ => return Err(miette!("Variables file {} must hold a JSON object", path.display())),
        }
    }
    for (name, raw) in &args.vars {
        let value = serde_json::from_str(raw)
            .map_or_else(|_| Value::from(raw.as_str()), json_to_value);
        variables.insert(name.clone(), value);
    }
    Ok(variables)
}

/// Run the render command.
pub fn run_render(args: RenderArgs) -> miette::Result<i32> {
    let content = read_to_string(&args.file)
        .map_err(|e| miette!("Cannot read template {}: {}", args.file.display(), e))?;
    let config: RenderConfig = match &args.config {
        Some(path) => serde_json::from_value(read_json(path, "config")?)
            .map_err(|e| miette!("Invalid config {}: {}", path.display(), e))?,
        None => RenderConfig::default(),
    };
    let variables = collect_variables(&args)?;

    let base_dir = args
        .base_dir
        .clone()
        .or_else(|| args.file.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let engine = Engine::builder()
        .loader(Arc::new(FileSystemLoader::new(base_dir)))
        .config(config)
        .build();

    let identity = args.file.display().to_string();
    let template = match engine.parse(&content, &identity) {
        Ok(template) => template,
        Err(e) => {
            let diagnostic = TemplateDiagnostic::from_parse_error(&args.file, &content, &e);
            eprintln!("{:?}", Report::new(diagnostic));
            return Ok(exitcode::DATAERR);
        }
    };

    let compiled = !args.interpret && engine.compile(&template).unit().is_some();
    let result = if compiled {
        engine.render(&template, variables)
    } else {
        engine.render_interpreted(&template, variables)
    };
    tracing::debug!(identity = %template.identity(), compiled, "rendered template");

    match result {
        Ok(output) => {
            if args.json {
                let json = serde_json::to_string_pretty(&RenderResult { output, compiled })
                    .map_err(|e| miette!("Failed to serialize output: {}", e))?;
                println!("{}", json);
            } else {
                print!("{}", output);
            }
            Ok(exitcode::OK)
        }
        Err(e) => {
            if args.json {
                let output = serde_json::json!({
                    "error": e.to_string()
                });
                eprintln!("{}", output);
            } else {
                eprintln!("Render error: {}", e);
            }
            Ok(exitcode::DATAERR)
        }
    }
}
