use std::io::Write;
use colored::*;
use env_logger::Builder;
use clap::Parser;
use clap::ArgAction;
use anyhow::Result;

use kf_structure::DotBracketVec;
use kf_structure::LoopTree;
use kf_energy::SequenceModel;

use knotfold::input_parsers::ruler;
use knotfold::input_parsers::read_records_input;
use knotfold::energy_parsers::EnergyModelArguments;

/// Print the loop decomposition of each input structure: the loop tree with
/// bands and band-spanning loops, then the energy of every loop.
#[derive(Debug, Parser)]
#[command(name = "kf-loops")]
#[command(author, version, about)]
pub struct Cli {
    /// Input file (FASTA-like, one or more records), or "-" for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: String,

    /// Verbosity (-v = info, -vv = debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten, next_help_heading = "Energy model parameters")]
    pub energy: EnergyModelArguments,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(buf, "{}", record.args())
        })
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let evaluator = cli.energy.build_evaluator()?;
    let max_length = evaluator.config().max_length;

    for record in read_records_input(&cli.input)? {
        if let Some(h) = &record.header {
            println!("{}", h.yellow())
        }
        let evaluated = SequenceModel::from_strings(&record.sequence, &record.structure, max_length)
            .and_then(|model| Ok((evaluator.engine().evaluate(&model)?, model)));
        let (eval, model) = match evaluated {
            Ok(x) => x,
            Err(e) => {
                println!("{}\n{} {} {}", record.sequence, record.structure, "ERROR:".red(), e);
                continue;
            }
        };

        println!("{}", ruler(model.len().saturating_sub(1)).magenta());
        println!("{}\n{}", model.sequence(), DotBracketVec::from(model.pairs()));
        let knots = if eval.tree.is_pseudoknot_free(LoopTree::ROOT) { "no" } else { "yes" };
        println!("{} nodes, pseudoknotted: {}", eval.tree.num_nodes(), knots);
        print!("{}", eval.tree);

        for c in &eval.contributions {
            println!("{:<41} {}", format!("{}:", c), format!("{:>6.2}", c.energy as f64 / 100.).green());
        }
        println!("{} {}", format!("{:<41}", "Total:").bold(), format!("{:>6.2}", eval.kcal()).green().bold());
        println!();
    }
    Ok(())
}
