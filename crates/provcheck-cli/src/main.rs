//! provcheck CLI
//!
//! - `sparql`: print the provenance query for a set of parameters/metrics
//! - `query`: run it against RO-Crate provenance documents
//! - `truth`: show the ground truth read from per-tool `summary.json` files
//! - `validate`: check that provenance and ground truth agree, then chart them

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use provcheck_graph::{load_all, ProvenanceGraph, DEFAULT_DOCUMENT_NAME};
use provcheck_query::{build, execute, Query, QuerySpec, ResultTable};
use provcheck_validate::{
    CrossValidator, FixedParameterFilter, TruthLoader, TruthTable, DEFAULT_KEY_PARAMETER,
    DEFAULT_METRIC, DEFAULT_TRUTH_FILE,
};

mod chart;
mod config;
mod logging;

use chart::Chart;
use config::{parse_fixed, resolve_tools, WorkflowConfig};

#[derive(Parser)]
#[command(name = "provcheck")]
#[command(
    author,
    version,
    about = "Query simulation provenance graphs and cross-check them against ground truth"
)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace); overrides PROVCHECK_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SPARQL query for the given names.
    Sparql {
        #[command(flatten)]
        names: NameArgs,
    },

    /// Run the provenance query and print the result table(s).
    Query {
        #[command(flatten)]
        source: ProvenanceArgs,
        #[command(flatten)]
        names: NameArgs,
        /// Output format: table|csv|json
        #[arg(long, default_value = "table")]
        format: String,
        /// Also print the generated SPARQL to stderr
        #[arg(long)]
        show_sparql: bool,
    },

    /// Print the ground truth loaded from `<truth-root>/<tool>/summary.json`.
    Truth {
        #[command(flatten)]
        truth: TruthArgs,
        /// Output format: table|csv|json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Cross-validate provenance against ground truth.
    ///
    /// Every provenance document is validated independently; the command fails
    /// if any of them disagrees with the ground truth.
    Validate {
        #[command(flatten)]
        source: ProvenanceArgs,
        #[command(flatten)]
        truth: TruthArgs,
        /// Extra parameters to select (the key parameter is always first)
        #[arg(long = "parameter", value_name = "NAME")]
        parameters: Vec<String>,
        /// Restrict the match to one named graph
        #[arg(long)]
        named_graph: Option<String>,
        /// Write a chart of the validated values (.svg or .json)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct NameArgs {
    /// Parameter name (repeatable; the first one is the key)
    #[arg(long = "parameter", value_name = "NAME", required = true)]
    parameters: Vec<String>,
    /// Metric name (repeatable)
    #[arg(long = "metric", value_name = "NAME", required = true)]
    metrics: Vec<String>,
    /// Tool name filter, case-insensitive substring of the tool label (repeatable)
    #[arg(long = "tool", value_name = "TOOL")]
    tools: Vec<String>,
    /// Restrict the match to one named graph
    #[arg(long)]
    named_graph: Option<String>,
}

impl NameArgs {
    fn spec(&self) -> QuerySpec {
        let spec = QuerySpec::new(self.parameters.clone(), self.metrics.clone())
            .with_tool_filters(self.tools.clone());
        match &self.named_graph {
            Some(iri) => spec.with_named_graph(iri.clone()),
            None => spec,
        }
    }
}

#[derive(Args)]
struct ProvenanceArgs {
    /// Provenance document, or a directory searched for `--document-name`
    #[arg(long)]
    provenance: PathBuf,
    #[arg(long, default_value = DEFAULT_DOCUMENT_NAME)]
    document_name: String,
}

impl ProvenanceArgs {
    fn load(&self) -> Result<Vec<ProvenanceGraph>> {
        Ok(load_all(&self.provenance, &self.document_name)?)
    }
}

#[derive(Args)]
struct TruthArgs {
    /// Directory holding one sub-directory per tool
    #[arg(long)]
    truth_root: PathBuf,
    /// Tool (repeatable); defaults to the tools of `--config`
    #[arg(long = "tool", value_name = "TOOL")]
    tools: Vec<String>,
    /// workflow_config.json providing the default tool list
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_TRUTH_FILE)]
    truth_file: String,
    /// Parameter identifying a run within a tool
    #[arg(long, default_value = DEFAULT_KEY_PARAMETER)]
    key_parameter: String,
    /// Metric compared against the provenance values
    #[arg(long, default_value = DEFAULT_METRIC)]
    metric: String,
    /// Only compare runs with this parameter value (name=value, repeatable;
    /// replaces the default element-order=1, element-degree=1)
    #[arg(long = "fixed", value_name = "NAME=VALUE")]
    fixed: Vec<String>,
    /// Compare every run, without a fixed-parameter filter
    #[arg(long, conflicts_with = "fixed")]
    no_fixed: bool,
}

impl TruthArgs {
    fn workflow_config(&self) -> Result<Option<WorkflowConfig>> {
        self.config.as_deref().map(WorkflowConfig::load).transpose()
    }

    fn filter(&self) -> Result<FixedParameterFilter> {
        if self.no_fixed {
            return Ok(FixedParameterFilter::none());
        }
        if self.fixed.is_empty() {
            return Ok(FixedParameterFilter::default());
        }
        let constraints = self
            .fixed
            .iter()
            .map(|raw| parse_fixed(raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(FixedParameterFilter::new(constraints))
    }

    fn loader(&self, filter: FixedParameterFilter) -> TruthLoader {
        TruthLoader::new()
            .with_key_parameter(self.key_parameter.clone())
            .with_metric(self.metric.clone())
            .with_filter(filter)
            .with_file_name(self.truth_file.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl OutputFormat {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(anyhow!(
                "unknown output format `{other}` (expected table|csv|json)"
            )),
        }
    }
}

#[derive(Serialize)]
struct LocatedTable<'a> {
    locator: &'a str,
    #[serde(flatten)]
    table: &'a ResultTable,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Sparql { names } => cmd_sparql(&names),
        Commands::Query {
            source,
            names,
            format,
            show_sparql,
        } => cmd_query(&source, &names, &format, show_sparql),
        Commands::Truth { truth, format } => cmd_truth(&truth, &format),
        Commands::Validate {
            source,
            truth,
            parameters,
            named_graph,
            out,
        } => cmd_validate(&source, &truth, &parameters, named_graph, out.as_deref()),
    }
}

fn cmd_sparql(names: &NameArgs) -> Result<()> {
    let query = build(&names.spec())?;
    println!("{}", query.to_sparql());
    Ok(())
}

fn run_query(graph: &ProvenanceGraph, query: &Query) -> Result<ResultTable> {
    execute(graph, query).with_context(|| format!("querying {}", graph.locator()))
}

fn cmd_query(
    source: &ProvenanceArgs,
    names: &NameArgs,
    format: &str,
    show_sparql: bool,
) -> Result<()> {
    let format = OutputFormat::parse(format)?;
    let query = build(&names.spec())?;
    if show_sparql {
        eprintln!("{}", query.to_sparql().dimmed());
    }
    let graphs = source.load()?;

    let tables = graphs
        .iter()
        .map(|g| run_query(g, &query))
        .collect::<Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => {
            let located: Vec<LocatedTable<'_>> = graphs
                .iter()
                .zip(&tables)
                .map(|(g, table)| LocatedTable {
                    locator: g.locator(),
                    table,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&located)?);
        }
        OutputFormat::Table | OutputFormat::Csv => {
            for (graph, table) in graphs.iter().zip(&tables) {
                eprintln!(
                    "{} {} ({} rows)",
                    "==".cyan().bold(),
                    graph.locator().bold(),
                    table.len()
                );
                if format == OutputFormat::Csv {
                    print!("{}", table.render_csv());
                } else {
                    print!("{}", table.render_text());
                }
            }
        }
    }
    Ok(())
}

struct LoadedTruth {
    tools: Vec<String>,
    filter: FixedParameterFilter,
    truth: TruthTable,
    config: Option<WorkflowConfig>,
}

fn load_truth(args: &TruthArgs) -> Result<LoadedTruth> {
    let config = args.workflow_config()?;
    let tools = resolve_tools(&args.tools, config.as_ref())?;
    let filter = args.filter()?;
    let truth = args
        .loader(filter.clone())
        .load(&args.truth_root, &tools)
        .with_context(|| format!("loading ground truth from {}", args.truth_root.display()))?;
    Ok(LoadedTruth {
        tools,
        filter,
        truth,
        config,
    })
}

fn cmd_truth(args: &TruthArgs, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format)?;
    let truth = load_truth(args)?.truth;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&truth.entries())?),
        OutputFormat::Csv => {
            println!("tool,{},{}", args.key_parameter, args.metric);
            for e in truth.entries() {
                println!("{},{},{}", e.tool, e.key, e.expected);
            }
        }
        OutputFormat::Table => {
            println!("{:<12} {:>14} {:>20}", "tool", args.key_parameter, args.metric);
            for e in truth.entries() {
                println!("{:<12} {:>14} {:>20}", e.tool, e.key, e.expected);
            }
        }
    }
    Ok(())
}

fn cmd_validate(
    source: &ProvenanceArgs,
    args: &TruthArgs,
    extra_parameters: &[String],
    named_graph: Option<String>,
    out: Option<&Path>,
) -> Result<()> {
    let LoadedTruth {
        tools,
        filter,
        truth,
        config,
    } = load_truth(args)?;

    // key parameter first; fixed columns are selected so the filter can see them
    let mut parameters = vec![args.key_parameter.clone()];
    for name in extra_parameters
        .iter()
        .map(String::as_str)
        .chain(filter.names())
    {
        if !parameters.iter().any(|p| p == name) {
            parameters.push(name.to_string());
        }
    }
    let mut spec =
        QuerySpec::new(parameters, [args.metric.clone()]).with_tool_filters(tools.clone());
    if let Some(iri) = named_graph {
        spec = spec.with_named_graph(iri);
    }
    let query = build(&spec)?;

    let graphs = source.load()?;
    let tables = graphs
        .iter()
        .map(|g| {
            let table = run_query(g, &query)?;
            Ok(filter.filter_table(&table)?)
        })
        .collect::<Result<Vec<_>>>()?;

    let validator = CrossValidator::new();
    let results = validator.validate_many(&truth, &tables, &tools);
    let mut failures = 0usize;
    for (graph, result) in graphs.iter().zip(&results) {
        match result {
            Ok(covered) => eprintln!(
                "{} {} ({})",
                "ok".green().bold(),
                graph.locator(),
                covered.iter().cloned().collect::<Vec<_>>().join(", ")
            ),
            Err(err) => {
                failures += 1;
                eprintln!("{} {}: {err}", "mismatch".red().bold(), graph.locator());
            }
        }
    }
    if failures > 0 {
        return Err(anyhow!(
            "{failures} of {} provenance document(s) disagree with the ground truth",
            graphs.len()
        ));
    }
    validator.check_coverage(&truth, &tables, &tools)?;
    eprintln!(
        "{} {} document(s), {} ground-truth entries, tolerance {}",
        "validated".green().bold(),
        graphs.len(),
        truth.len(),
        validator.tolerance()
    );

    if let (Some(path), Some((first, rest))) = (out, tables.split_first()) {
        let mut combined = first.clone();
        for table in rest {
            combined.rows.extend(table.rows.iter().cloned());
        }
        let title = config
            .as_ref()
            .and_then(|c| c.benchmark.clone())
            .unwrap_or_else(|| "provenance vs. ground truth".to_string());
        Chart::from_table(&combined, &title)?.write(path)?;
        eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
    }
    Ok(())
}
