//! # DSF Harmonizer
//!
//! Command-line tool for reviewing Differential Scanning Fluorimetry plates:
//! jump detection and correction, auto-trim and melting-temperature export.
//!
//! ## Usage
//!
//! ```bash
//! # Report suspect samples
//! dsf-harmonizer scan plate.gdsf
//!
//! # Correct all suspects and save the corrected curves
//! dsf-harmonizer correct plate.gdsf plate_corrected.gdsf --iterative
//!
//! # Trim curves so their Tm falls between 45 and 60 °C
//! dsf-harmonizer trim plate.gdsf trimmed.gdsf --tm-window 45 60
//!
//! # Tm table
//! dsf-harmonizer tm plate.gdsf -o tm.tsv
//!
//! # Everything at once
//! dsf-harmonizer --config dsf.toml export plate.gdsf out/
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
