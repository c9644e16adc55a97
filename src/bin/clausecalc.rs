use anyhow::Context;
use clap::{Parser, Subcommand};
use clause_calc_core::bindings::json::{handle_batch_json, handle_compute_json};
use clause_calc_core::clause::{build_tree, sort_siblings, ClauseId, ClauseNode, ClauseRecord};
use clause_calc_core::display::trace::format_trace;
use clause_calc_core::store::{CustomFormulaRecord, InMemoryFormulaStore};
use clause_calc_core::{ComputeRequest, ComputeService, EngineConfig, FormulaRegistry};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Building-code calculator and clause tools
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine config (JSON)
    #[arg(short, long, value_name = "FILE", env = "CLAUSECALC_CONFIG")]
    config: Option<PathBuf>,

    /// Custom formula records (JSON array) to serve alongside the built-ins
    #[arg(long, value_name = "FILE")]
    custom: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a formula from command-line values
    Compute {
        /// Formula id
        block_id: String,
        /// Parameter value, `name=value` (repeatable)
        #[arg(short, long = "value", value_name = "NAME=VALUE")]
        values: Vec<String>,
        /// Scope for custom formulas
        #[arg(long)]
        scope: Option<String>,
        /// Print a readable calculation trace instead of JSON
        #[arg(long)]
        trace: bool,
    },

    /// Answer a JSON compute request (a single object or an array) from a file or stdin
    Request {
        /// Request file; stdin when omitted
        file: Option<PathBuf>,
    },

    /// List the built-in formulas
    List,

    /// Sort clause numbers and print them one per line
    SortIds {
        ids: Vec<String>,
    },

    /// Print the clause tree assembled from a JSON array of records
    Tree {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Compute { block_id, values, scope, trace } => {
            let service = build_service(&config, cli.custom.as_deref()).await?;
            let mut request = ComputeRequest::new(&block_id, scope.as_deref());
            for pair in &values {
                let (name, value) = pair
                    .split_once('=')
                    .with_context(|| format!("expected NAME=VALUE, got '{}'", pair))?;
                request = request.with_value(name.trim(), value);
            }

            if trace {
                let result = service
                    .compute(&request)
                    .await
                    .map_err(|e| anyhow::anyhow!(e.messages().join("\n")))?;
                let formula = service
                    .registry()
                    .resolve(block_id.trim(), scope.as_deref())
                    .await
                    .and_then(Result::ok)
                    .with_context(|| format!("formula '{}' is no longer available", block_id))?;
                print!("{}", format_trace(formula.definition(), &result, config.display_digits));
            } else {
                let body = serde_json::to_string(&request)?;
                let response = handle_compute_json(&service, &body, config.display_digits).await;
                println!("{}", response.to_json()?);
            }
        }
        Commands::Request { file } => {
            let service = build_service(&config, cli.custom.as_deref()).await?;
            let body = match file {
                Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            if body.trim_start().starts_with('[') {
                let responses = handle_batch_json(&service, &body, config.display_digits).await;
                println!("{}", serde_json::to_string(&responses)?);
            } else {
                let response = handle_compute_json(&service, &body, config.display_digits).await;
                println!("{}", response.to_json()?);
            }
        }
        Commands::List => {
            let registry = FormulaRegistry::with_builtins(config.limits.clone())?;
            for def in registry.builtins() {
                println!("{:<24} {}", def.id, def.title);
            }
        }
        Commands::SortIds { ids } => {
            let mut parsed = ids
                .iter()
                .map(|s| ClauseId::parse_with_bound(s, config.max_top_segment))
                .collect::<Result<Vec<_>, _>>()?;
            parsed.sort();
            for id in parsed {
                println!("{}", id);
            }
        }
        Commands::Tree { file } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {:?}", file))?;
            let records: Vec<ClauseRecord> = serde_json::from_str(&text)?;
            let mut tree = build_tree(&records, None)?;
            sort_siblings(&mut tree);
            print_tree(&tree);
        }
    }

    Ok(())
}

async fn build_service(config: &EngineConfig, custom: Option<&Path>) -> anyhow::Result<ComputeService> {
    let mut registry = FormulaRegistry::with_builtins(config.limits.clone())?;
    if let Some(path) = custom {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        let records: Vec<CustomFormulaRecord> = serde_json::from_str(&text)?;
        let store = Arc::new(InMemoryFormulaStore::new(config.limits.clone()));
        for record in records {
            store.insert(record).await?;
        }
        registry = registry.with_custom_source(store, config.cache_ttl());
    }
    Ok(ComputeService::new(Arc::new(registry)))
}

fn print_tree(roots: &[ClauseNode]) {
    let mut stack: Vec<(&ClauseNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        println!("{}{} {}", "  ".repeat(depth), node.id, node.title);
        stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
    }
}
