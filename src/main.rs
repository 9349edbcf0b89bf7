//! Paramgrid - normalizes spreadsheet parameter lists.

mod config;
mod error;
mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use paramgrid_core::{
    Analysis, AnalysisOptions, CachedValueEvaluator, EvaluationRequest, Evaluator, analyze_file,
    dependency_chain, dependency_edges, parameter_details,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{CliError, parse_override};

/// Parameter workbook analysis: ids, dependency graph, roles, duplicate
/// merging and formula repair.
#[derive(Parser)]
#[command(name = "paramgrid", version, about)]
struct Cli {
    /// Config file (default: config.toml in the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Workbook to read (.xlsx, .xlsm or .csv).
    file: PathBuf,

    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a workbook and write the normalized copy.
    Analyze {
        #[command(flatten)]
        input: Input,

        /// Where to write the normalized workbook (default: FILE_optimized.EXT).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Analyze only; do not write a workbook.
        #[arg(long)]
        no_write: bool,
    },
    /// Print the evaluation order.
    Order {
        #[command(flatten)]
        input: Input,
    },
    /// Print the dependency tree of one parameter.
    Chain {
        #[command(flatten)]
        input: Input,

        /// Parameter id.
        id: String,
    },
    /// Print every dependency edge.
    Edges {
        #[command(flatten)]
        input: Input,
    },
    /// Ask the evaluator for the value of every non-input parameter.
    Evaluate {
        #[command(flatten)]
        input: Input,

        /// Input override, ID=VALUE (repeatable).
        #[arg(long = "set", value_name = "ID=VALUE")]
        overrides: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (options, warnings) = config::load_options(cli.config.as_deref());
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }

    match cli.command {
        Commands::Analyze {
            input,
            output,
            no_write,
        } => {
            let options = AnalysisOptions {
                write_output: options.write_output && !no_write,
                ..options
            };
            let report = analyze_file(&input.file, &options, output.as_deref())
                .with_context(|| format!("Failed to analyze {}", input.file.display()))?;
            if input.json {
                print_json(&report)?;
            } else {
                print!("{}", report::summary(&report));
            }
        }
        Commands::Order { input } => {
            let analysis = analyze_only(&input.file, &options)?;
            if input.json {
                print_json(&analysis.order)?;
            } else {
                print!("{}", report::order(&analysis));
            }
        }
        Commands::Chain { input, id } => {
            let analysis = analyze_only(&input.file, &options)?;
            if input.json {
                let details =
                    parameter_details(&analysis, &id).ok_or_else(|| CliError::UnknownParameter(id.clone()))?;
                print_json(&details)?;
            } else {
                let param = analysis
                    .parameter(&id)
                    .ok_or_else(|| CliError::UnknownParameter(id.clone()))?;
                let root = format!("{} = {}", param.name, param.value);
                print!("{}", report::chain(&root, &dependency_chain(&analysis, &id)));
            }
        }
        Commands::Edges { input } => {
            let analysis = analyze_only(&input.file, &options)?;
            let edges = dependency_edges(&analysis);
            if input.json {
                print_json(&edges)?;
            } else {
                print!("{}", report::edges(&edges));
            }
        }
        Commands::Evaluate { input, overrides } => {
            let analysis = analyze_only(&input.file, &options)?;
            let overrides = overrides
                .iter()
                .map(|text| parse_override(text))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let request = EvaluationRequest::new(&analysis, overrides);
            let results = CachedValueEvaluator.evaluate(&request);
            if input.json {
                let json: serde_json::Map<String, serde_json::Value> = results
                    .iter()
                    .map(|(id, result)| {
                        let value = match result {
                            Ok(value) => serde_json::json!({ "value": value }),
                            Err(err) => serde_json::json!({ "error": err.to_string() }),
                        };
                        (id.clone(), value)
                    })
                    .collect();
                print_json(&json)?;
            } else {
                print!("{}", report::evaluation(&results));
            }
        }
    }
    Ok(())
}

fn analyze_only(file: &Path, options: &AnalysisOptions) -> Result<Analysis> {
    let options = AnalysisOptions {
        write_output: false,
        ..options.clone()
    };
    let report =
        analyze_file(file, &options, None).with_context(|| format!("Failed to analyze {}", file.display()))?;
    Ok(report.analysis)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
