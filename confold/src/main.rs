use std::{fs::read_to_string, io::Read, path::PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use lib_confold::{
    alignment::{Alignment, mean_pairwise_identity},
    context::FoldContext,
    fold::consensus_fold,
    io::parse_alignment,
    model::{BacktrackType, DangleModel, ModelConfig},
};
use log::{LevelFilter, debug, info};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

#[derive(Parser)]
#[clap(version, about = "Consensus structure prediction for nucleotide alignments")]
struct Cli {
    #[clap(long, short = 'l', default_value = "info")]
    log_level: LevelFilter,

    /// The alignment file, FASTA or one aligned sequence per line.
    ///
    /// Reads from stdin when omitted.
    input: Option<PathBuf>,

    /// Folding temperature in degrees Celsius.
    #[clap(long, short = 'T', default_value = "37.0")]
    temperature: f64,

    /// Treat the alignment as circular.
    #[clap(long)]
    circular: bool,

    /// Predict quadruplex motifs in consensus guanine runs.
    #[clap(long)]
    gquad: bool,

    /// Disallow base pairs that cannot stack on another pair.
    #[clap(long)]
    no_lonely_pairs: bool,

    /// Disallow GU wobble pairs.
    #[clap(long)]
    no_wobble: bool,

    /// How unpaired neighbors of helix ends are scored.
    #[clap(long, default_value = "mismatch")]
    dangles: DangleOption,

    /// Maximum base-pair span in alignment columns.
    #[clap(long)]
    max_span: Option<usize>,

    /// Hard constraint string in pseudo-dot-bracket notation.
    #[clap(long, short = 'C')]
    constraint: Option<String>,

    /// Weight of the covariance bonus.
    #[clap(long, default_value = "1.0")]
    cv_factor: f64,

    /// Weight of the penalty for sequences that cannot form a pair.
    #[clap(long, default_value = "1.0")]
    nc_factor: f64,

    /// Which matrix the traceback starts from.
    #[clap(long, default_value = "prefix")]
    backtrack: BacktrackOption,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DangleOption {
    None,
    Mismatch,
}

impl From<DangleOption> for DangleModel {
    fn from(option: DangleOption) -> Self {
        match option {
            DangleOption::None => DangleModel::None,
            DangleOption::Mismatch => DangleModel::Mismatch,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BacktrackOption {
    Prefix,
    ClosingPair,
    Fragment,
}

impl From<BacktrackOption> for BacktrackType {
    fn from(option: BacktrackOption) -> Self {
        match option {
            BacktrackOption::Prefix => BacktrackType::Prefix,
            BacktrackOption::ClosingPair => BacktrackType::ClosingPair,
            BacktrackOption::Fragment => BacktrackType::Fragment,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    TermLogger::init(
        cli.log_level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let input = match &cli.input {
        Some(path) => read_to_string(path)
            .with_context(|| format!("unable to read input file {path:?}"))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let records = parse_alignment(&input)?;
    let sequences: Vec<&str> = records
        .iter()
        .map(|record| record.sequence.as_str())
        .collect();
    debug!("read {} aligned sequences", sequences.len());

    let alignment = Alignment::new(&sequences, cli.circular)?;
    let model = ModelConfig {
        temperature: cli.temperature,
        dangles: cli.dangles.into(),
        circular: cli.circular,
        quadruplex: cli.gquad,
        no_lonely_pairs: cli.no_lonely_pairs,
        wobble_pairs: !cli.no_wobble,
        max_pair_span: cli.max_span,
        covariance_factor: cli.cv_factor,
        non_compatible_factor: cli.nc_factor,
        backtrack_type: cli.backtrack.into(),
        ..ModelConfig::default()
    };

    let mut context = FoldContext::new(&alignment, &model)?;
    if let Some(constraint) = &cli.constraint {
        context.constrain(constraint)?;
    }

    let (mean, minimum) = mean_pairwise_identity(&sequences);
    info!(
        "{} sequences over {} columns, mean pairwise identity {mean:.2}% (minimum {minimum:.2}%)",
        sequences.len(),
        alignment.columns(),
    );

    let result = consensus_fold(&context)?;
    println!("{}", result.structure);
    println!(
        "minimum free energy: {:.2} kcal/mol ({:.2} thermodynamic {:+.2} covariance)",
        result.energy,
        result.energy + result.covariance,
        -result.covariance,
    );

    Ok(())
}
