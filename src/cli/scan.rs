use anyhow::Result;
use log::info;
use std::path::PathBuf;

use dsf_harmonizer::config::AnalysisConfig;
use dsf_harmonizer::report::PlateReport;

/// Scan a plate for suspect jumps and print the report
pub fn run(input: PathBuf, config: &AnalysisConfig, json: bool) -> Result<()> {
    let mut plate = super::load_plate(&input)?;
    info!("Loaded {} sample(s) from {}", plate.len(), input.display());

    let suspects = plate.scan_suspects(&config.jump);
    info!("{} suspect sample(s)", suspects);

    let report = PlateReport::build(&mut plate, config, input.display().to_string());
    super::print_report(&report, json)
}
