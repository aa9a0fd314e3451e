use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use dsf_harmonizer::correction::JumpDirection;
use dsf_harmonizer::gdsf::read_gdsf;
use dsf_harmonizer::plate::Plate;
use dsf_harmonizer::report::PlateReport;
use dsf_harmonizer::stats::DispersionMethod;

mod config;
mod correct;
mod export;
mod scan;
mod tm;
mod trim;

/// DSF Harmonizer - jump correction and Tm estimation for DSF curves
#[derive(Parser)]
#[command(name = "dsf-harmonizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load analysis settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Analysis flags shared by every subcommand. Each one overrides the value
/// from the config file when given.
#[derive(Args, Debug, Default, Clone)]
pub struct AnalysisArgs {
    /// Absolute jump threshold in fluorescence units (0 disables)
    #[arg(long, value_name = "RFU")]
    abs_threshold: Option<String>,

    /// Relative threshold multiplier applied to the dispersion (0 disables)
    #[arg(short = 'k', long, value_name = "K")]
    k: Option<String>,

    /// Dispersion method for the relative threshold (MAD, STD)
    #[arg(long, value_name = "METHOD")]
    method: Option<DispersionMethod>,

    /// Repeat detection and correction until no jump remains
    #[arg(long)]
    iterative: bool,

    /// Correct only the largest jump per pass instead of all detected jumps
    #[arg(long)]
    single_jump: bool,

    /// Cap on correction passes in iterative mode
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,

    /// Single-jump direction (auto, add, sub)
    #[arg(long, value_name = "DIR")]
    direction: Option<JumpDirection>,

    /// Enable display smoothing
    #[arg(long)]
    smooth: bool,

    /// Smoothing strength (0-100)
    #[arg(long, value_name = "STRENGTH")]
    strength: Option<String>,

    /// Tm outlier threshold in °C
    #[arg(long, value_name = "DEG")]
    outlier_threshold: Option<String>,

    /// Fixed reference Tm in °C (mean of computed Tms when omitted)
    #[arg(long, value_name = "DEG")]
    reference: Option<String>,

    /// Expected Tm window for auto-trim
    #[arg(long, num_args = 2, value_names = ["LO", "HI"])]
    tm_window: Option<Vec<String>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a plate for suspect jumps and print a report
    Scan {
        /// Input .gdsf file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Correct jumps and write the corrected curves
    Correct {
        /// Input .gdsf file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output .gdsf file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Only correct these samples (all suspects when omitted)
        #[arg(short, long = "sample", value_name = "ID")]
        samples: Vec<String>,

        /// Correct the jump at this index of each selected sample
        #[arg(long, value_name = "INDEX", requires = "samples")]
        index: Option<usize>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Trim curves so their Tm falls inside the expected window
    Trim {
        /// Input .gdsf file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output .gdsf file (proposals are only printed when omitted)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Only apply proposals for these samples
        #[arg(short, long = "sample", value_name = "ID")]
        samples: Vec<String>,

        /// Set this analysis range on the selected samples instead of searching
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], requires = "samples")]
        range: Option<Vec<f64>>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Print Tm statistics and optionally write the Tm table
    Tm {
        /// Input .gdsf file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Tm table output (.tsv for tab-separated, comma-separated otherwise)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Run the full pipeline and write every export
    Export {
        /// Input .gdsf file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory
        #[arg(value_name = "DIR")]
        output_dir: PathBuf,

        /// Samples to exclude from every export
        #[arg(long = "delete", value_name = "ID")]
        deleted: Vec<String>,

        /// Skip jump correction
        #[arg(long)]
        no_correct: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn load_plate(input: &Path) -> Result<Plate> {
    if !input.exists() {
        anyhow::bail!("File does not exist: {}", input.display());
    }
    let plate = read_gdsf(input)
        .with_context(|| format!("Failed to read GDSF file: {}", input.display()))?;
    if plate.is_empty() {
        anyhow::bail!("No sample with signal found in {}", input.display());
    }
    Ok(plate)
}

fn print_report(report: &PlateReport, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{}", text);
        return Ok(());
    }

    #[cfg(feature = "colorized_output")]
    {
        println!("{}", report.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", report);
    }

    Ok(())
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Commands::Scan {
            input,
            json,
            analysis,
        } => {
            let config = config::resolve(config_path.as_deref(), &analysis)?;
            scan::run(input, &config, json)
        }
        Commands::Correct {
            input,
            output,
            samples,
            index,
            analysis,
        } => {
            let config = config::resolve(config_path.as_deref(), &analysis)?;
            correct::run(input, output, &samples, index, &config)
        }
        Commands::Trim {
            input,
            output,
            samples,
            range,
            analysis,
        } => {
            let config = config::resolve(config_path.as_deref(), &analysis)?;
            trim::run(input, output, &samples, range.as_deref(), &config)
        }
        Commands::Tm {
            input,
            output,
            json,
            analysis,
        } => {
            let config = config::resolve(config_path.as_deref(), &analysis)?;
            tm::run(input, output, json, &config)
        }
        Commands::Export {
            input,
            output_dir,
            deleted,
            no_correct,
            analysis,
        } => {
            let config = config::resolve(config_path.as_deref(), &analysis)?;
            export::run(input, output_dir, &deleted, !no_correct, &config)
        }
    }
}
