use std::io::Write;
use log::{info, warn};
use colored::*;
use env_logger::Builder;
use clap::Args;
use clap::Parser;
use clap::ArgAction;
use anyhow::Result;
use rayon::prelude::*;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use serde::Serialize;

use kf_energy::Evaluation;
use kf_energy::EnergyError;
use kf_energy::LoopContribution;

use knotfold::input_parsers::EvalRecord;
use knotfold::input_parsers::ruler;
use knotfold::input_parsers::read_records_input;
use knotfold::energy_parsers::EnergyModelArguments;


#[derive(Debug, Args)]
pub struct EvalInput {
    /// Input file (FASTA-like, one or more records), or "-" for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: String,

    /// Print one JSON object per record, with the per-loop breakdown
    #[arg(long)]
    pub json: bool,

    /// Show a progress bar while evaluating
    #[arg(long)]
    pub progress: bool,

    /// Number of worker threads (0 = one per core)
    #[arg(short = 'j', long, default_value_t = 0)]
    pub threads: usize,

    /// Verbosity (-v = info, -vv = debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}


#[derive(Debug, Parser)]
#[command(name = "kf-eval")]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub eval: EvalInput,

    #[command(flatten, next_help_heading = "Energy model parameters")]
    pub energy: EnergyModelArguments,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    header: Option<&'a str>,
    sequence: &'a str,
    structure: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loops: Option<&'a [LoopContribution]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> JsonRecord<'a> {
    fn new(record: &'a EvalRecord, result: &'a Result<Evaluation, EnergyError>) -> Self {
        let (energy, loops, error) = match result {
            Ok(eval) => (Some(eval.kcal()), Some(&eval.contributions[..]), None),
            Err(e) => (None, None, Some(e.to_string())),
        };
        JsonRecord {
            header: record.header.as_deref(),
            sequence: &record.sequence,
            structure: &record.structure,
            energy,
            loops,
            error,
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            // no prefix, just the message
            writeln!(buf, "{}", record.args())
        })
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.eval.verbose);

    if cli.eval.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.eval.threads)
            .build_global()?;
    }

    let evaluator = cli.energy.build_evaluator()?;
    let records = read_records_input(&cli.eval.input)?;

    let pb = if cli.eval.progress {
        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    // Per-loop log lines of parallel evaluations would interleave.
    let results: Vec<Result<Evaluation, EnergyError>> = if records.len() == 1 {
        vec![evaluator.evaluate(&records[0].sequence, &records[0].structure)]
    } else {
        records.par_iter()
            .map_init(
                || pb.clone(),
                |pb, r| {
                    let result = evaluator.evaluate(&r.sequence, &r.structure);
                    pb.inc(1);
                    result
                },
            ).collect()
    };
    pb.finish_and_clear();

    let mut failed = 0;
    for (record, result) in records.iter().zip(&results) {
        if result.is_err() {
            failed += 1;
        }
        if cli.eval.json {
            println!("{}", serde_json::to_string(&JsonRecord::new(record, result))?);
            continue;
        }

        if let Some(h) = &record.header {
            println!("{}", h.yellow())
        }
        info!("{}", ruler(record.sequence.len().saturating_sub(1)).magenta());
        match result {
            Ok(eval) => println!("{}\n{} {}", record.sequence, record.structure,
                format!("{:>6.2}", eval.kcal()).green()),
            Err(e) => println!("{}\n{} {} {}", record.sequence, record.structure,
                "ERROR:".red(), e),
        }
    }

    if failed > 0 {
        warn!("{} {} of {} records could not be evaluated.", "WARNING:".red(), failed, records.len());
    }
    Ok(())
}
