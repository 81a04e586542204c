mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::aggregate::{AggregateArgs, TableArgs};
use commands::group::{GroupArgs, GroupSeriesArgs};
use commands::kpi::KpiArgs;
use commands::plan::{NormalizeArgs, ResolveArgs};

/// Workforce plan aggregation and KPI derivation
#[derive(Parser)]
#[command(
    name = "wfp",
    version,
    about = "Workforce plan aggregation and KPI derivation",
    long_about = "A CLI over the workforce planning engine. Normalizes backend plan records, \
                  resolves entries against defaults, aggregates monthly fields per role and \
                  level, and derives yearly KPIs for single offices and office groups."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine settings file (JSON or YAML); replaces settings embedded in the input
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log computation details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize backend plan records into office plans
    Normalize(NormalizeArgs),
    /// Resolve one (role, level, month, year) entry
    Resolve(ResolveArgs),
    /// Twelve-month series of one field
    Aggregate(AggregateArgs),
    /// Every field row for one office and year
    Table(TableArgs),
    /// List the field catalog
    Fields,
    /// Yearly KPIs for one office
    Kpis(KpiArgs),
    /// Yearly KPIs across several offices
    Group(GroupArgs),
    /// One field summed across offices, per role and level
    GroupSeries(GroupSeriesArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match cli.config.as_deref().map(input::config::load_settings) {
        Some(Ok(s)) => Some(s),
        Some(Err(e)) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
        None => None,
    };
    let settings = settings.as_ref();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Normalize(args) => commands::plan::run_normalize(args, settings),
        Commands::Resolve(args) => commands::plan::run_resolve(args, settings),
        Commands::Aggregate(args) => commands::aggregate::run_aggregate(args, settings, &cli.output),
        Commands::Table(args) => commands::aggregate::run_table(args, settings, &cli.output),
        Commands::Fields => commands::aggregate::run_fields(),
        Commands::Kpis(args) => commands::kpi::run_kpis(args, settings),
        Commands::Group(args) => commands::group::run_group(args, settings),
        Commands::GroupSeries(args) => {
            commands::group::run_group_series(args, settings, &cli.output)
        }
        Commands::Version => {
            println!("wfp {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
