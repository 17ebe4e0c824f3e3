#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use std::process;

use intervention_scores::config::AnalysisConfig;
use intervention_scores::report::{
    CutoffReport, format_baseline, format_report, reports_to_json, write_report_tsv,
};
use intervention_scores::types::parse_condition;
use intervention_scores::{FilterConditions, ScoreEngine, ScoreQuery};

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text tables on stdout
    Table,
    /// positives_<cutoff>.tsv and negatives_<cutoff>.tsv files
    Tsv,
    /// A JSON document on stdout
    Json,
}

#[derive(Args)]
pub struct SelectionArgs {
    /// Path to a TOML configuration file (defaults reproduce the campus simulation exports)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Data source selector; unknown selectors use the configured default source
    #[arg(long, value_name = "SELECTOR")]
    pub source: Option<String>,

    /// Only use runs where COLUMN equals VALUE (repeatable, all must hold)
    #[arg(long = "where", value_name = "COLUMN=VALUE", value_parser = parse_condition)]
    pub conditions: Vec<(String, String)>,

    /// Override the outcome column name
    #[arg(long, value_name = "NAME")]
    pub outcome_column: Option<String>,

    /// Override the constant the outcome count is divided by
    #[arg(long, value_name = "N")]
    pub normalization: Option<f64>,

    /// Use exactly these categorical columns instead of those preceding the outcome column
    #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
    pub categorical: Option<Vec<String>>,
}

#[derive(Args)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Outcome fraction cutoff; runs at or below it form the filtered set (repeatable)
    #[arg(long, value_name = "FRACTION", required = true, allow_negative_numbers = true)]
    pub cutoff: Vec<f64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Directory for TSV output
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Also write the filtered runs to this CSV file
    #[arg(long, value_name = "FILE")]
    pub rows_out: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "intervention-scores",
    version,
    about = "Rank simulation interventions by how their frequency shifts among low-outcome runs."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score labeled values at one or more outcome cutoffs
    #[command(about = "Rank interventions at one or more cutoffs")]
    Score(ScoreArgs),

    /// Print the baseline ratio of every labeled value
    #[command(about = "Print baseline ratios grouped by column")]
    Baseline(SelectionArgs),

    /// Print the effective configuration as TOML
    #[command(about = "Print the effective configuration")]
    Config(SelectionArgs),

    /// Display version information
    #[command(about = "Display version information")]
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Score(args)) => run_score(args),
        Some(Commands::Baseline(args)) => run_baseline(args),
        Some(Commands::Config(args)) => run_config(args),
        Some(Commands::Version) => {
            println!(
                "{} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            );
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Loads the configuration file (if any) and applies command-line overrides.
fn effective_config(args: &SelectionArgs) -> Result<AnalysisConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from '{}'", path.display());
            AnalysisConfig::load(path)?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(outcome_column) = &args.outcome_column {
        config.outcome_column = outcome_column.clone();
    }
    if let Some(normalization) = args.normalization {
        config.normalization = normalization;
    }
    if let Some(columns) = &args.categorical {
        config.categorical_columns = Some(columns.clone());
    }
    config.validate()?;
    Ok(config)
}

fn conditions_from(args: &SelectionArgs) -> FilterConditions {
    args.conditions.iter().cloned().collect()
}

fn run_score(args: ScoreArgs) -> Result<(), Box<dyn Error>> {
    let config = effective_config(&args.selection)?;
    let conditions = conditions_from(&args.selection);
    let selector = args.selection.source.clone().unwrap_or_default();
    let engine = ScoreEngine::new(config.sources.clone(), config.extraction_settings());

    let mut reports = Vec::with_capacity(args.cutoff.len());
    for &cutoff in &args.cutoff {
        let outcome = engine.query(&ScoreQuery {
            cutoff,
            conditions: conditions.clone(),
            selector: selector.clone(),
        })?;
        reports.push(CutoffReport::new(
            &selector,
            &conditions,
            cutoff,
            outcome.tables,
        ));
    }

    match args.format {
        OutputFormat::Table => {
            for report in &reports {
                println!("{}", format_report(report));
            }
        }
        OutputFormat::Tsv => {
            for report in &reports {
                let (positives, negatives) = write_report_tsv(report, &args.out_dir)?;
                println!("Positives saved to: {}", positives.display());
                println!("Negatives saved to: {}", negatives.display());
            }
        }
        OutputFormat::Json => println!("{}", reports_to_json(&reports)?),
    }

    if let Some(path) = &args.rows_out {
        let selection = engine.selection(&selector, &conditions)?;
        selection.rows().write_csv(path)?;
        log::info!(
            "Wrote {} filtered runs to '{}'",
            selection.rows().height(),
            path.display()
        );
    }

    Ok(())
}

fn run_baseline(args: SelectionArgs) -> Result<(), Box<dyn Error>> {
    let config = effective_config(&args)?;
    let conditions = conditions_from(&args);
    let selector = args.source.clone().unwrap_or_default();
    let engine = ScoreEngine::new(config.sources.clone(), config.extraction_settings());

    let selection = engine.selection(&selector, &conditions)?;
    println!(
        "Baseline over {} runs (conditions: {})",
        selection.rows().height(),
        conditions
    );
    print!("{}", format_baseline(selection.baseline()));
    Ok(())
}

fn run_config(args: SelectionArgs) -> Result<(), Box<dyn Error>> {
    let config = effective_config(&args)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
