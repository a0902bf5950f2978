// ========================================================================================
//
//                      The command-line front end: ABPS
//
// ========================================================================================
//
// This binary is a thin orchestrator. It parses arguments, loads the frozen parameter
// artifact once, reads the caller's table, hands everything to the library, and writes
// the scores. Advisory warnings reach the user through the logger on stderr; fatal
// problems end the process with a one-line message and a non-zero exit status.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use abps::io::{self, DataError};
use abps::{AbpsScorer, ModelError, ParameterBundle, off_scores};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(
    name = "abps",
    version,
    about = "Blood-profile risk scores for anti-doping surveillance",
    long_about = "Computes the Abnormal Blood Profile Score (an ensemble of a naive Bayes \
                  and an RBF support-vector classifier over seven haematological markers) \
                  and the OFF-score from haemoglobin and reticulocytes."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a table of blood panels with the ABPS models
    #[command(about = "Compute ABPS for every row of a sample table")]
    Score(ScoreArgs),

    /// Compute OFF-scores from HGB (g/L) and RETP (%)
    #[command(about = "Compute OFF-scores")]
    Off(OffArgs),
}

#[derive(Args)]
struct ScoreArgs {
    /// Path to the sample table (.tsv, or .csv) with RETP, HGB, HCT, RBC, MCV, MCH, MCHC columns
    #[arg(value_name = "SAMPLES")]
    samples: PathBuf,

    /// Path to the parameter artifact (.toml)
    #[arg(long)]
    model: PathBuf,

    /// Write scores here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Also report the naive Bayes and SVM component scores
    #[arg(long)]
    components: bool,
}

#[derive(Args)]
struct OffArgs {
    /// Haemoglobin values in g/L
    #[arg(long, num_args = 1.., conflicts_with = "input")]
    hgb: Vec<f64>,

    /// Reticulocyte percentages, paired with --hgb
    #[arg(long, num_args = 1.., conflicts_with = "input")]
    retp: Vec<f64>,

    /// Read HGB and RETP columns from a table instead
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write scores here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Input(#[from] abps::InputError),
    #[error(transparent)]
    OffScore(#[from] abps::OffScoreError),
    #[error("Failed to create output file '{path}': {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Nothing to score. Pass --hgb and --retp values, or --input with a table.")]
    NoOffInput,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Score(args)) => run_score(args),
        Some(Commands::Off(args)) => run_off(args),
        None => {
            if Cli::command().print_help().is_err() {
                process::exit(1);
            }
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|source| CliError::Output {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout().lock()))),
    }
}

fn run_score(args: ScoreArgs) -> Result<(), CliError> {
    let bundle = ParameterBundle::load(&args.model)?;
    let table = io::read_table(&args.samples)?;
    log::info!(
        "Scoring {} sample(s) from {}",
        table.rows.len(),
        args.samples.display()
    );

    let report = AbpsScorer::new(&bundle).score_input(table.into())?;
    io::write_abps_report(open_output(args.output.as_deref())?, &report, args.components)?;
    Ok(())
}

fn run_off(args: OffArgs) -> Result<(), CliError> {
    let (hgb, retp) = match &args.input {
        Some(path) => {
            let table = io::read_table(path)?;
            let as_values = |column: Vec<Option<f64>>| -> Vec<f64> {
                column.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
            };
            (as_values(table.column("HGB")?), as_values(table.column("RETP")?))
        }
        None if args.hgb.is_empty() && args.retp.is_empty() => return Err(CliError::NoOffInput),
        None => (args.hgb.clone(), args.retp.clone()),
    };

    let report = off_scores(&hgb, &retp)?;
    io::write_off_report(open_output(args.output.as_deref())?, &report)?;
    Ok(())
}
